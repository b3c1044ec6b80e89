//! Field-level summary of a population of encoded nodes.
//!
//! ```text
//! complexity(shape) = Π ln(d + 1)
//! total_energy      = Σ activity × complexity           (encoded nodes)
//! coherence         = exp(−Var(activity))               (all supplied nodes)
//! entropy           = −Σ p_s ln p_s / ln(count)         (signature groups)
//! ```
//!
//! Variance is the population variance. Entropy is normalized by the log of
//! the encoded-node count, so it is 0 when every node shares one signature
//! and 1 when every signature is distinct; with a single node it is 0.
//!
//! Components and group tallies keep the order in which nodes are supplied.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::math::{exp, ln};
use crate::signature::ShapeEncoding;

/// One encoded node's contribution to a [`GestaltField`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldComponent<Id> {
    /// Node id.
    pub id: Id,
    /// Encoded shape.
    pub shape: Vec<usize>,
    /// Activity supplied for the node.
    pub activity: f64,
    /// `Π ln(d + 1)` over the shape.
    pub complexity: f64,
}

/// Shannon entropy of the signature distribution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignatureEntropy {
    /// `−Σ p ln p` in nats.
    pub raw: f64,
    /// `raw / ln(count)`, in [0, 1].
    pub normalized: f64,
    /// Node count per signature, in first-seen order.
    pub groups: Vec<(String, usize)>,
}

/// Aggregate view over a set of nodes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GestaltField<Id> {
    /// Encoded nodes, in supplied order.
    pub components: Vec<FieldComponent<Id>>,
    /// Activity-weighted complexity sum.
    pub total_energy: f64,
    /// `exp(−variance)` of all supplied activities, in (0, 1].
    pub coherence: f64,
    /// Signature entropy over encoded nodes.
    pub entropy: SignatureEntropy,
}

impl<Id> GestaltField<Id> {
    /// Normalized signature entropy.
    pub fn normalized_entropy(&self) -> f64 {
        self.entropy.normalized
    }
}

/// `Π ln(d + 1)` over every dimension of the shape.
pub fn complexity(encoding: &ShapeEncoding) -> f64 {
    encoding
        .shape()
        .iter()
        .map(|&d| ln(d as f64 + 1.0))
        .product()
}

/// Population variance. Zero for fewer than two values.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Synthesize a field from `(id, encoding, activity)` triples.
///
/// Nodes without an encoding still count toward coherence. Returns `None`
/// when no supplied node has an encoding.
pub fn synthesize<'a, Id, I>(nodes: I) -> Option<GestaltField<Id>>
where
    Id: Clone + 'a,
    I: IntoIterator<Item = (&'a Id, Option<&'a ShapeEncoding>, f64)>,
{
    let mut activities = Vec::new();
    let mut components = Vec::new();
    let mut total_energy = 0.0;
    let mut group_index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, usize)> = Vec::new();

    for (id, encoding, activity) in nodes {
        activities.push(activity);
        let Some(encoding) = encoding else { continue };

        let c = complexity(encoding);
        total_energy += activity * c;
        components.push(FieldComponent {
            id: id.clone(),
            shape: encoding.shape().to_vec(),
            activity,
            complexity: c,
        });

        let sig = encoding.signature();
        match group_index.get(sig) {
            Some(&slot) => groups[slot].1 += 1,
            None => {
                group_index.insert(sig, groups.len());
                groups.push((sig, 1));
            }
        }
    }

    if components.is_empty() {
        return None;
    }

    let count = components.len();
    let raw: f64 = groups
        .iter()
        .map(|&(_, k)| {
            let p = k as f64 / count as f64;
            -p * ln(p)
        })
        .sum();
    let normalized = if count > 1 && groups.len() > 1 {
        (raw / ln(count as f64)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Some(GestaltField {
        components,
        total_energy,
        coherence: exp(-population_variance(&activities)),
        entropy: SignatureEntropy {
            raw,
            normalized,
            groups: groups
                .into_iter()
                .map(|(s, k)| (String::from(s), k))
                .collect(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureEncoder;

    fn enc(shape: &[usize]) -> ShapeEncoding {
        SignatureEncoder::new().encode(shape).unwrap()
    }

    #[test]
    fn test_no_encoded_nodes_gives_none() {
        let none: [(&u32, Option<&ShapeEncoding>, f64); 0] = [];
        assert!(synthesize(none).is_none());
        assert!(synthesize([(&1u32, None, 1.0)]).is_none());
    }

    #[test]
    fn test_single_node_field() {
        let e = enc(&[2, 3]);
        let field = synthesize([(&"x", Some(&e), 2.0)]).unwrap();
        let want = 2.0 * ln(3.0) * ln(4.0);
        assert!((field.total_energy - want).abs() < 1e-9);
        assert_eq!(field.coherence, 1.0);
        assert_eq!(field.entropy.normalized, 0.0);
        assert_eq!(field.entropy.raw, 0.0);
        assert_eq!(field.components.len(), 1);
        assert_eq!(field.components[0].shape, [2, 3]);
    }

    #[test]
    fn test_equal_activity_is_fully_coherent() {
        let e = enc(&[4]);
        let ids = [1u32, 2, 3];
        let field = synthesize(ids.iter().map(|id| (id, Some(&e), 0.7))).unwrap();
        assert_eq!(field.coherence, 1.0);
        // one signature group
        assert_eq!(field.entropy.normalized, 0.0);
        assert_eq!(field.entropy.groups, [(String::from("vector_c2*2"), 3)]);
    }

    #[test]
    fn test_distinct_signatures_have_full_entropy() {
        let encs = [enc(&[2]), enc(&[3]), enc(&[5]), enc(&[7])];
        let ids = [0u32, 1, 2, 3];
        let field = synthesize(ids.iter().zip(encs.iter()).map(|(id, e)| (id, Some(e), 1.0))).unwrap();
        assert!((field.entropy.normalized - 1.0).abs() < 1e-9);
        assert!((field.entropy.raw - ln(4.0)).abs() < 1e-9);
    }

    #[test]
    fn test_entropy_between_bounds() {
        let a = enc(&[2, 2]);
        let b = enc(&[3, 5]);
        let ids = [0u32, 1, 2];
        let field = synthesize([
            (&ids[0], Some(&a), 1.0),
            (&ids[1], Some(&a), 1.0),
            (&ids[2], Some(&b), 1.0),
        ])
        .unwrap();
        let p: [f64; 2] = [2.0 / 3.0, 1.0 / 3.0];
        let raw = -(p[0] * ln(p[0]) + p[1] * ln(p[1]));
        assert!((field.entropy.normalized - raw / ln(3.0)).abs() < 1e-9);
        assert!(field.entropy.normalized > 0.0 && field.entropy.normalized < 1.0);
    }

    #[test]
    fn test_coherence_counts_unencoded_activity() {
        let e = enc(&[3]);
        let ids = [0u32, 1];
        // activities 0 and 2: variance 1
        let field = synthesize([(&ids[0], Some(&e), 0.0), (&ids[1], None, 2.0)]).unwrap();
        assert!((field.coherence - exp(-1.0)).abs() < 1e-9);
        assert_eq!(field.components.len(), 1);
        assert_eq!(field.total_energy, 0.0);
    }

    #[test]
    fn test_population_variance() {
        assert_eq!(population_variance(&[]), 0.0);
        assert_eq!(population_variance(&[5.0]), 0.0);
        assert_eq!(population_variance(&[1.0, 3.0]), 1.0);
        assert_eq!(population_variance(&[2.0, 2.0, 2.0]), 0.0);
    }
}
