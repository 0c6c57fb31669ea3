use crate::error::{Error, Result};

pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u32);
}

impl<F> ProgressSink for F
where
    F: Fn(u32) + Send + Sync,
{
    fn report(&self, percent: u32) {
        self(percent)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressScale {
    divisor: u32,
    addend: u32,
}

impl ProgressScale {
    pub fn new(divisor: u32, addend: u32) -> Result<Self> {
        if divisor == 0 {
            return Err(Error::ZeroDivisor);
        }
        Ok(Self { divisor, addend })
    }

    pub const fn identity() -> Self {
        Self {
            divisor: 1,
            addend: 0,
        }
    }

    pub fn slice(phase: u32, phases: u32) -> Result<Self> {
        if phases == 0 {
            return Err(Error::ZeroDivisor);
        }
        Self::new(phases, phase.saturating_mul(100 / phases))
    }

    pub fn apply(&self, value: u32) -> u32 {
        (value / self.divisor).saturating_add(self.addend).min(100)
    }
}

pub struct ScaledProgress<'a> {
    inner: &'a dyn ProgressSink,
    scale: ProgressScale,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink, scale: ProgressScale) -> Self {
        Self { inner, scale }
    }
}

impl ProgressSink for ScaledProgress<'_> {
    fn report(&self, percent: u32) {
        self.inner.report(self.scale.apply(percent));
    }
}

pub(crate) fn percent(step: usize, total: usize) -> u32 {
    ((step.saturating_mul(100)) / total.max(1)) as u32
}
