use crate::ArtifactKind;

/// Number of ordered pipeline steps.
pub const STEP_COUNT: u8 = 5;

/// Human-readable label for a step index; `0` means nothing has been produced yet.
pub fn step_label(step: u8) -> &'static str {
    match step {
        0 => "Waiting",
        1 => "Generating figure",
        2 => "Segmenting elements",
        3 => "Extracting icons",
        4 => "Building SVG template",
        _ => "Assembling final SVG",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepAdvance {
    pub step: u8,
    pub changed: bool,
}

/// Highest pipeline step reached so far. Never moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepModel {
    current: u8,
}

impl StepModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u8 {
        self.current
    }

    /// Moves to the step of `kind` if it is ahead of the current one.
    ///
    /// Kinds without a step are ignored. Reaching a step that is already
    /// current (two kinds can share one) reports `changed = false`.
    pub fn advance(&mut self, kind: &ArtifactKind) -> StepAdvance {
        match kind.step() {
            Some(step) if step > self.current => {
                self.current = step;
                StepAdvance {
                    step,
                    changed: true,
                }
            }
            _ => StepAdvance {
                step: self.current,
                changed: false,
            },
        }
    }

    /// Progress as a fraction in `[0.0, 1.0]`.
    pub fn fraction(&self) -> f32 {
        f32::from(self.current) / f32::from(STEP_COUNT)
    }

    pub fn label(&self) -> &'static str {
        step_label(self.current)
    }
}
