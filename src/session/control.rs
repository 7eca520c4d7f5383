//! Session commands and edge-triggered flag latches

/// Operations the control layer can request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Capture element positions and derive footprints
    CaptureSource,
    /// Capture the viewer's target pose and object positions, rebuild the grid
    CaptureTarget,
    /// Fresh analysis, send the scene, request an optimization round
    Optimize,
}

/// Fires once on each false to true transition of a flag
#[derive(Clone, Copy, Debug, Default)]
pub struct EdgeTrigger {
    prev: bool,
}

impl EdgeTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current flag value; true on a rising edge
    pub fn update(&mut self, flag: bool) -> bool {
        let fired = flag && !self.prev;
        self.prev = flag;
        fired
    }
}

/// Latches for the three boolean toggles of a UI layer
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlPanel {
    source: EdgeTrigger,
    target: EdgeTrigger,
    optimize: EdgeTrigger,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands whose flag rose since the last poll, in capture order
    pub fn poll(&mut self, source: bool, target: bool, optimize: bool) -> Vec<Command> {
        let mut commands = Vec::new();
        if self.source.update(source) {
            commands.push(Command::CaptureSource);
        }
        if self.target.update(target) {
            commands.push(Command::CaptureTarget);
        }
        if self.optimize.update(optimize) {
            commands.push(Command::Optimize);
        }
        commands
    }
}
