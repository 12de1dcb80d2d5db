//! ARMv7-M initial exception frame.
//!
//! Writing the frame is plain memory work, so it is kept apart from the
//! register-level port code and also builds on the host.

/// xPSR with only the Thumb bit set.
pub(crate) const INITIAL_XPSR: u32 = 0x0100_0000;

/// 8 hardware-stacked + 8 software-saved registers.
pub(crate) const FRAME_WORDS: usize = 16;

const LR_SLOT: usize = 13;
const PC_SLOT: usize = 14;
const XPSR_SLOT: usize = 15;

/// Address to stack as PC for `target`.
///
/// Thumb state comes from xPSR.T; the stacked PC must be halfword aligned,
/// so the interworking bit of a function address is cleared.
#[inline]
pub(crate) fn stacked_pc(target: usize) -> u32 {
    target as u32 & !1
}

/// Write a first-switch frame that resumes at `entry` and returns into
/// `exit`, and return its lowest address.
///
/// ```text
/// [Hardware stacked frame]
///   xPSR  (Thumb bit set)
///   PC    (entry, bit 0 clear)
///   LR    (exit)
///   R12, R3..R0  (0)
/// [Software saved context]
///   R11..R4  (0)           <- returned pointer
/// ```
///
/// # Safety
/// `FRAME_WORDS` writable words must lie directly below `stack_top`.
pub(crate) unsafe fn write_initial_frame(stack_top: *mut u32, entry: usize, exit: usize) -> *mut u32 {
    let frame = stack_top.sub(FRAME_WORDS);

    // R4–R11, then R0–R3 and R12
    for i in 0..LR_SLOT {
        frame.add(i).write(0);
    }
    frame.add(LR_SLOT).write(exit as u32);
    frame.add(PC_SLOT).write(stacked_pc(entry));
    frame.add(XPSR_SLOT).write(INITIAL_XPSR);

    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacked_pc_clears_thumb_bit() {
        assert_eq!(stacked_pc(0x0800_0401), 0x0800_0400);
        assert_eq!(stacked_pc(0x0800_0400), 0x0800_0400);
    }

    #[test]
    fn test_initial_frame_layout() {
        let mut stack = [0xDEAD_BEEFu32; 20];
        let top = unsafe { stack.as_mut_ptr().add(stack.len()) };

        let frame = unsafe { write_initial_frame(top, 0x0800_0123, 0x0800_0201) };

        assert_eq!(frame, unsafe { top.sub(FRAME_WORDS) });
        assert!(stack[..4].iter().all(|&w| w == 0xDEAD_BEEF));
        let words = &stack[4..];
        assert!(words[..LR_SLOT].iter().all(|&w| w == 0));
        assert_eq!(words[LR_SLOT], 0x0800_0201);
        assert_eq!(words[PC_SLOT], 0x0800_0122);
        assert_eq!(words[PC_SLOT] & 1, 0);
        assert_eq!(words[XPSR_SLOT], INITIAL_XPSR);
    }
}
