//! CSS selector specificity calculation.
//! Spec: <https://www.w3.org/TR/selectors-3/#specificity>

use crate::{ComplexSelector, CompoundSelector, PseudoClass, SelectorList, SimpleSelector};

/// Specificity triple (a, b, c).
/// Spec: Section 13 — Calculating a selector's specificity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Specificity(pub u16, pub u16, pub u16);

impl Specificity {
    /// Component-wise saturating sum.
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self(
            self.0.saturating_add(other.0),
            self.1.saturating_add(other.1),
            self.2.saturating_add(other.2),
        )
    }
}

/// Compute the specificity of a compound selector.
/// Spec: Section 13 — Specificity (a, b, c)
///
/// `:not()` and `:is()` contribute the specificity of their most specific argument.
pub fn specificity_of_compound(compound: &CompoundSelector) -> Specificity {
    compound
        .simples
        .iter()
        .fold(Specificity::default(), |total, simple| {
            let contribution = match simple {
                SimpleSelector::IdSelector(_) => Specificity(1, 0, 0),
                SimpleSelector::Class(_) | SimpleSelector::Attribute(_) => Specificity(0, 1, 0),
                SimpleSelector::Pseudo(PseudoClass::Not(list) | PseudoClass::Is(list)) => {
                    specificity_of_list(list)
                }
                SimpleSelector::Pseudo(_) => Specificity(0, 1, 0),
                SimpleSelector::Type(_) => Specificity(0, 0, 1),
                SimpleSelector::Universal => Specificity::default(),
            };
            total.plus(contribution)
        })
}

/// Compute the specificity of a complex selector (sum of its compounds).
/// Spec: Section 13 — Specificity accumulation
pub fn specificity_of_complex(sel: &ComplexSelector) -> Specificity {
    sel.rest
        .iter()
        .fold(specificity_of_compound(&sel.first), |total, pair| {
            total.plus(specificity_of_compound(&pair.1))
        })
}

/// The highest specificity among the selectors of a list.
pub fn specificity_of_list(list: &SelectorList) -> Specificity {
    list.selectors
        .iter()
        .map(specificity_of_complex)
        .max()
        .unwrap_or_default()
}
