/// Events emitted by session transitions.
/// The presentation layer consumes these for sound.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// Player moved one cell.
    Step,
    /// A box or key was pushed along with the step.
    Push,
    /// A key opened a locked door.
    DoorOpened,
    Undo,
    Reset,
    LevelComplete { level: usize, time_ms: u64, moves: u32 },
    /// The last level of the pack was left via Enter.
    PackComplete,
    /// Cursor moved or a screen was entered.
    Select,
    /// Input that had no effect (blocked move, locked level).
    Rejected,
    DialogOpened,
    HelpOpened,
    HelpPageTurned,
}
