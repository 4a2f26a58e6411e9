/// A `ParamGen` generates values for the initial state of a network's parameters.
pub trait ParamGen {
    /// Overwrites every value of `params` with freshly generated ones.
    ///
    /// # Arguments
    /// * `params` - The parameter buffer to fill.
    fn fill(&mut self, params: &mut [f32]);
}
