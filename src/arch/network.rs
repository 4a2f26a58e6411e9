use ndarray::{Array1, ArrayView1, ArrayView2, ArrayViewMut2, Zip, s};
use rand::Rng;

use super::{LayerTopology, Sigmoid};
use crate::{
    Result, SweepErr,
    initialization::{ConstParamGen, ParamGen, RandParamGen},
};

/// The inclusive bound of the uniform distribution fresh weights are drawn from.
pub const WEIGHT_RANGE: f32 = 1.;

/// The coefficients of the momentum delta rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LearningRule {
    pub eta: f32,
    pub momentum: f32,
}

/// The numeric state of a multilayer perceptron with sigmoid units.
///
/// Every transition into layer `i` owns a flat buffer of `n * (p + 1)` values, where `n` is
/// the width of layer `i` and `p` the width of layer `i - 1`. Neuron `j`'s incoming weights
/// live at `j * (p + 1) .. j * (p + 1) + p` and its bias right after them, so the buffer
/// reads as a row-major `(n, p + 1)` matrix.
#[derive(Clone, Debug)]
pub struct NetworkState {
    topology: LayerTopology,
    weights: Vec<Box<[f32]>>,
    prev_updates: Vec<Box<[f32]>>,
    activations: Vec<Array1<f32>>,
    deltas: Vec<Array1<f32>>,
}

impl NetworkState {
    /// Creates a new `NetworkState` with every weight set to zero.
    ///
    /// # Arguments
    /// * `topology` - The widths of the layers of the network.
    ///
    /// # Returns
    /// A new `NetworkState` instance.
    pub fn new(topology: LayerTopology) -> Self {
        let buffers: Vec<Box<[f32]>> = (0..topology.transitions())
            .map(|i| vec![0.; topology.transition_size(i)].into_boxed_slice())
            .collect();

        let activations = topology
            .layers()
            .iter()
            .map(|&width| Array1::zeros(width))
            .collect();

        let deltas = topology.layers()[1..]
            .iter()
            .map(|&width| Array1::zeros(width))
            .collect();

        Self {
            topology,
            prev_updates: buffers.clone(),
            weights: buffers,
            activations,
            deltas,
        }
    }

    pub fn topology(&self) -> &LayerTopology {
        &self.topology
    }

    /// Returns the flat weight buffer of the transition into layer `i + 1`.
    pub fn weights(&self, i: usize) -> &[f32] {
        &self.weights[i]
    }

    /// Returns the previous update applied to each weight of the transition into layer `i + 1`.
    pub fn prev_updates(&self, i: usize) -> &[f32] {
        &self.prev_updates[i]
    }

    /// Returns the activations computed for layer `i` on the last forward pass.
    pub fn activations(&self, i: usize) -> ArrayView1<'_, f32> {
        self.activations[i].view()
    }

    /// Fills every weight using `param_gen` and clears the momentum buffers.
    ///
    /// # Arguments
    /// * `param_gen` - The generator of the new weights.
    pub fn fill_weights<P: ParamGen>(&mut self, param_gen: &mut P) {
        let mut zero = ConstParamGen::new(0.);

        for (weights, prev_updates) in self.weights.iter_mut().zip(&mut self.prev_updates) {
            param_gen.fill(weights);
            zero.fill(prev_updates);
        }
    }

    /// Reinitializes every weight uniformly over `[-1, 1]` and clears the momentum buffers.
    ///
    /// # Arguments
    /// * `rng` - The random source to draw the weights from.
    pub fn fill_random_weights<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let mut param_gen = RandParamGen::uniform_inclusive(rng, -WEIGHT_RANGE, WEIGHT_RANGE)?;
        self.fill_weights(&mut param_gen);
        Ok(())
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `input` - A sample of the width of the input layer.
    ///
    /// # Returns
    /// The activations of the output layer or a `ShapeMismatch` error.
    pub fn forward(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        check_len("input", input.len(), self.topology.input_width())?;
        self.activations[0].assign(&ArrayView1::from(input));

        for i in 0..self.topology.transitions() {
            let (n, p) = self.topology.transition_dim(i);
            let w = view_matrix(&self.weights[i], n, p)?;

            let (prev, next) = self.activations.split_at_mut(i + 1);
            let x = &prev[i];

            for (a, row) in next[0].iter_mut().zip(w.outer_iter()) {
                let z = row.slice(s![..p]).dot(x) + row[p];
                *a = Sigmoid::f(z);
            }
        }

        Ok(self.activations[self.topology.transitions()].to_vec())
    }

    /// Applies one stochastic backpropagation step with momentum, it assumes `output` was
    /// produced by the last `forward` call.
    ///
    /// # Arguments
    /// * `output` - The output of the last forward pass.
    /// * `expected` - The expected output for the same sample.
    /// * `rule` - The learning rate and momentum coefficient.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the vectors don't match the output layer.
    pub fn backprop(&mut self, output: &[f32], expected: &[f32], rule: LearningRule) -> Result<()> {
        check_len("expected", expected.len(), output.len())?;
        check_len("output", output.len(), self.topology.output_width())?;

        let last = self.topology.transitions() - 1;
        let LearningRule { eta, momentum } = rule;

        Zip::from(&mut self.deltas[last])
            .and(&ArrayView1::from(output))
            .and(&ArrayView1::from(expected))
            .for_each(|d, &o, &t| *d = Sigmoid::df_from_output(o) * (t - o));

        for i in (0..=last).rev() {
            let (n, p) = self.topology.transition_dim(i);
            let x = &self.activations[i];
            let d = &self.deltas[i];

            let mut w = view_matrix_mut(&mut self.weights[i], n, p)?;
            let mut m = view_matrix_mut(&mut self.prev_updates[i], n, p)?;

            // The bias is a weight whose input is always 1.
            Zip::indexed(&mut w)
                .and(&mut m)
                .for_each(|(j, k), w, m| {
                    let input = if k < p { x[k] } else { 1. };
                    let update = eta * d[j] * input + momentum * *m;
                    *w += update;
                    *m = update;
                });

            if i == 0 {
                break;
            }

            let w = view_matrix(&self.weights[i], n, p)?;
            let back = w.slice(s![.., ..p]).t().dot(d);

            let (lower, _) = self.deltas.split_at_mut(i);
            Zip::from(&mut lower[i - 1])
                .and(&back)
                .and(&self.activations[i])
                .for_each(|d, &sum, &a| *d = Sigmoid::df_from_output(a) * sum);
        }

        Ok(())
    }
}

fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(SweepErr::ShapeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

/// Gives a view of a flat weight buffer as a `(n, p + 1)` matrix.
fn view_matrix(buf: &[f32], n: usize, p: usize) -> Result<ArrayView2<'_, f32>> {
    let got = buf.len();
    ArrayView2::from_shape((n, p + 1), buf).map_err(|_| SweepErr::ShapeMismatch {
        what: "weights",
        got,
        expected: n * (p + 1),
    })
}

fn view_matrix_mut(buf: &mut [f32], n: usize, p: usize) -> Result<ArrayViewMut2<'_, f32>> {
    let got = buf.len();
    ArrayViewMut2::from_shape((n, p + 1), buf).map_err(|_| SweepErr::ShapeMismatch {
        what: "weights",
        got,
        expected: n * (p + 1),
    })
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn network(layers: &[usize]) -> NetworkState {
        NetworkState::new(LayerTopology::new(layers.iter().copied()).unwrap())
    }

    fn abs_err(output: &[f32], expected: &[f32]) -> f32 {
        output.iter().zip(expected).map(|(o, t)| (o - t).abs()).sum()
    }

    #[test]
    fn zero_weights_output_half() {
        for layers in [&[1, 1][..], &[4, 4, 1], &[3, 5, 2, 4]] {
            let mut net = network(layers);
            let input = vec![1.; layers[0]];

            let output = net.forward(&input).unwrap();

            assert_eq!(output.len(), *layers.last().unwrap());
            assert!(output.iter().all(|&o| o == 0.5));
        }
    }

    #[test]
    fn forward_known_values() {
        let mut net = network(&[2, 1]);
        net.fill_weights(&mut ConstParamGen::new(1.));

        // z = 1 * 1 + 2 * 1 + 1 (bias)
        let output = net.forward(&[1., 2.]).unwrap();
        assert!((output[0] - Sigmoid::f(4.)).abs() < 1e-6);
    }

    #[test]
    fn forward_rejects_wrong_input() {
        let mut net = network(&[4, 4, 1]);

        let err = net.forward(&[1., 0.]).unwrap_err();
        assert!(matches!(
            err,
            SweepErr::ShapeMismatch {
                what: "input",
                got: 2,
                expected: 4
            }
        ));
    }

    #[test]
    fn backprop_rejects_wrong_expected() {
        let mut net = network(&[2, 2]);
        let output = net.forward(&[0., 1.]).unwrap();

        assert!(net.backprop(&output, &[1.], LearningRule { eta: 0.1, momentum: 0. }).is_err());
    }

    #[test]
    fn backprop_descends() {
        let mut rng = StdRng::seed_from_u64(3);
        let rule = LearningRule {
            eta: 0.05,
            momentum: 0.,
        };

        for layers in [&[2, 1][..], &[4, 4, 1], &[3, 6, 4, 1]] {
            let mut net = network(layers);
            net.fill_random_weights(&mut rng).unwrap();

            let input: Vec<f32> = (0..layers[0]).map(|i| (i % 2) as f32).collect();
            let expected = vec![1.; *layers.last().unwrap()];

            let before = net.forward(&input).unwrap();
            net.backprop(&before, &expected, rule).unwrap();
            let after = net.forward(&input).unwrap();

            assert!(abs_err(&after, &expected) < abs_err(&before, &expected));
        }
    }

    #[test]
    fn momentum_buffer_tracks_updates() {
        let mut net = network(&[1, 1]);
        let rule = LearningRule {
            eta: 1.,
            momentum: 0.5,
        };

        // With zero weights the output is 0.5, so the delta is 0.25 * 0.5.
        let output = net.forward(&[1.]).unwrap();
        net.backprop(&output, &[1.], rule).unwrap();

        let first = 0.25 * 0.5;
        assert!((net.weights(0)[0] - first).abs() < 1e-6);
        assert!((net.prev_updates(0)[0] - first).abs() < 1e-6);
        assert!((net.prev_updates(0)[1] - first).abs() < 1e-6);
    }

    #[test]
    fn fill_random_weights_resets_momentum() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut net = network(&[2, 3, 1]);
        net.fill_random_weights(&mut rng).unwrap();

        let output = net.forward(&[1., 0.]).unwrap();
        net.backprop(&output, &[0.], LearningRule { eta: 0.5, momentum: 0.9 })
            .unwrap();
        net.fill_random_weights(&mut rng).unwrap();

        for i in 0..2 {
            assert!(net.prev_updates(i).iter().all(|&m| m == 0.));
            assert!(net.weights(i).iter().all(|w| (-1. ..=1.).contains(w)));
        }
    }
}
