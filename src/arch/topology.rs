use std::fmt;

use crate::{Result, SweepErr};

/// The widths of every layer of a multilayer perceptron, input layer first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerTopology {
    layers: Box<[usize]>,
}

impl LayerTopology {
    /// Creates a new `LayerTopology`.
    ///
    /// # Arguments
    /// * `layers` - The width of each layer, `layers[0]` being the input width.
    ///
    /// # Returns
    /// An `InvalidTopology` error if there are less than 2 layers or a layer is empty.
    pub fn new<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let layers: Box<[usize]> = layers.into_iter().collect();

        if layers.len() < 2 || layers.contains(&0) {
            return Err(SweepErr::InvalidTopology {
                layers: layers.into_vec(),
            });
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[usize] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn input_width(&self) -> usize {
        self.layers[0]
    }

    pub fn output_width(&self) -> usize {
        self.layers[self.layers.len() - 1]
    }

    /// Returns the amount of layer transitions, that is, of weight buffers.
    pub fn transitions(&self) -> usize {
        self.layers.len() - 1
    }

    /// Returns the `(neurons, inputs)` pair of the transition into layer `i + 1`.
    pub fn transition_dim(&self, i: usize) -> (usize, usize) {
        (self.layers[i + 1], self.layers[i])
    }

    /// Returns the size of the flat weight buffer of a transition, biases included.
    pub fn transition_size(&self, i: usize) -> usize {
        let (n, p) = self.transition_dim(i);
        n * (p + 1)
    }

    /// Returns the total amount of trainable parameters.
    pub fn size(&self) -> usize {
        (0..self.transitions()).map(|i| self.transition_size(i)).sum()
    }
}

impl fmt::Display for LayerTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<String> = self.layers.iter().map(usize::to_string).collect();
        f.write_str(&widths.join("-"))
    }
}
