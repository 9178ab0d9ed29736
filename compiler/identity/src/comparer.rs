use crate::{AssemblyIdentity, PublicKeyToken};
use utility::HashSet;

/// The set of strong-named assemblies whose versions are interchangeable.
///
/// A reference to a unified assembly binds to a definition of *any* version, and two
/// identities of a unified assembly are duplicates of each other.
#[derive(Clone, Default, Debug)]
pub struct UnificationPolicy {
    unified: HashSet<(String, PublicKeyToken)>,
}

impl UnificationPolicy {
    #[must_use]
    pub fn unify(mut self, name: &str, token: PublicKeyToken) -> Self {
        self.unified.insert((name.to_ascii_lowercase(), token));
        self
    }

    fn is_unified(&self, identity: &AssemblyIdentity) -> bool {
        identity
            .public_key_token
            .is_some_and(|token| self.unified.contains(&(identity.simple_name_key(), token)))
    }
}

/// How a referenced identity is satisfied by a definition.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Match {
    /// The definition is exactly what was asked for.
    ///
    /// For weak identities, this only requires the simple names to agree.
    Exact,
    /// The definition is a different version of the referenced strong-named assembly.
    Unified,
}

/// How two accepted references relate to each other.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Equivalence {
    /// Both are strong and equal or unified.
    Strong,
    /// Both are weak and share a simple name.
    Weak,
}

#[derive(Clone, Default, Debug)]
pub struct IdentityComparer {
    policy: UnificationPolicy,
}

impl IdentityComparer {
    pub fn new(policy: UnificationPolicy) -> Self {
        Self { policy }
    }

    /// Decide whether the `definition` satisfies the `reference`.
    ///
    /// Strong-named references accept definitions of the same or of a higher version.
    /// Lower versions are only accepted for assemblies listed in the unification policy.
    pub fn reference_matches_definition(
        &self,
        reference: &AssemblyIdentity,
        definition: &AssemblyIdentity,
    ) -> Option<Match> {
        if !reference.same_simple_name(definition)
            || reference.public_key_token != definition.public_key_token
        {
            return None;
        }

        if !reference.is_strong() {
            return Some(Match::Exact);
        }

        if !reference.same_culture(definition) {
            return None;
        }

        if reference.version == definition.version {
            Some(Match::Exact)
        } else if definition.version > reference.version || self.policy.is_unified(reference) {
            Some(Match::Unified)
        } else {
            None
        }
    }

    pub fn equivalence(&self, left: &AssemblyIdentity, right: &AssemblyIdentity) -> Option<Equivalence> {
        if !left.same_simple_name(right) {
            return None;
        }

        match (left.public_key_token, right.public_key_token) {
            (None, None) => Some(Equivalence::Weak),
            (Some(left_token), Some(right_token)) if left_token == right_token => {
                let equal = left.version == right.version && left.same_culture(right);
                let unified = left.same_culture(right) && self.policy.is_unified(left);

                (equal || unified).then_some(Equivalence::Strong)
            }
            _ => None,
        }
    }
}
