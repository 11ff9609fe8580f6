/// Commands pushed from the driver thread into the audio callback's ring
/// buffer. Kept `Copy` so the queue never allocates.
#[derive(Debug, Clone, Copy)]
pub enum PlayerCommand {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
    StopAll,
}
