use super::ParamGen;

/// A parameter generator that always generates the same value.
#[derive(Clone, Copy, Debug)]
pub struct ConstParamGen {
    value: f32,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `value` - The value to always generate.
    ///
    /// # Returns
    /// A new `ConstParamGen` instance.
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl ParamGen for ConstParamGen {
    fn fill(&mut self, params: &mut [f32]) {
        params.fill(self.value);
    }
}
