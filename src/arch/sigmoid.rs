/// The logistic activation, `1 / (1 + e^-z)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sigmoid;

impl Sigmoid {
    pub fn f(z: f32) -> f32 {
        1. / (1. + (-z).exp())
    }

    /// The derivative expressed through the activation itself, `a * (1 - a)`.
    pub fn df_from_output(a: f32) -> f32 {
        a * (1. - a)
    }
}
