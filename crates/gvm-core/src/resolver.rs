use std::collections::BTreeMap;

use gvm_backend::{GoVersion, ResolutionError, VersionPattern, VersionSpec, Versioned};

/// Alias chains longer than this are treated as cycles.
pub const MAX_ALIAS_DEPTH: usize = 32;

/// A spec with every alias substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expanded {
    Exact { version: GoVersion, stable_only: bool },
    Pattern { pattern: VersionPattern, stable_only: bool },
}

/// Resolves a [`VersionSpec`] against a universe of candidates, which is
/// either the installed set or the remote catalog.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    aliases: BTreeMap<String, VersionSpec>,
}

impl Resolver {
    #[must_use]
    pub fn new(aliases: BTreeMap<String, VersionSpec>) -> Self {
        Self { aliases }
    }

    /// Substitute aliases until an exact version or pattern remains.
    ///
    /// A `stable:` wrapper anywhere along the chain applies to the final
    /// result.
    ///
    /// # Errors
    /// Returns [`ResolutionError::NotFound`] for an unknown alias and
    /// [`ResolutionError::AliasCycle`] when a name repeats or the chain exceeds
    /// [`MAX_ALIAS_DEPTH`].
    pub fn expand(&self, spec: &VersionSpec) -> Result<Expanded, ResolutionError> {
        let mut stable_only = false;
        let mut chain: Vec<String> = Vec::new();
        let mut current = spec;

        loop {
            match current {
                VersionSpec::Stable(inner) => {
                    stable_only = true;
                    current = inner.as_ref();
                }
                VersionSpec::Alias(name) => {
                    let repeated = chain.contains(name);
                    chain.push(name.clone());
                    if repeated || chain.len() > MAX_ALIAS_DEPTH {
                        return Err(ResolutionError::AliasCycle { chain });
                    }
                    current = self
                        .aliases
                        .get(name)
                        .ok_or_else(|| ResolutionError::NotFound { spec: name.clone() })?;
                }
                VersionSpec::Exact(version) => {
                    return Ok(Expanded::Exact {
                        version: version.clone(),
                        stable_only,
                    });
                }
                VersionSpec::Wildcard(pattern) => {
                    return Ok(Expanded::Pattern {
                        pattern: pattern.clone(),
                        stable_only,
                    });
                }
            }
        }
    }

    /// Every candidate `spec` selects, ascending.
    ///
    /// # Errors
    /// Returns [`ResolutionError::NotFound`] when an exact version is absent
    /// and [`ResolutionError::NoMatch`] when filtering leaves nothing.
    pub fn resolve_all<'a, T: Versioned>(
        &self,
        spec: &VersionSpec,
        universe: &'a [T],
    ) -> Result<Vec<&'a T>, ResolutionError> {
        let no_match = || ResolutionError::NoMatch {
            spec: spec.to_string(),
        };

        match self.expand(spec)? {
            Expanded::Exact {
                version,
                stable_only,
            } => {
                let found = universe
                    .iter()
                    .find(|candidate| *candidate.version() == version)
                    .ok_or_else(|| ResolutionError::NotFound {
                        spec: spec.to_string(),
                    })?;
                if stable_only && !version.is_stable() {
                    return Err(no_match());
                }
                Ok(vec![found])
            }
            Expanded::Pattern {
                pattern,
                stable_only,
            } => {
                let mut matches: Vec<&T> = universe
                    .iter()
                    .filter(|candidate| pattern.matches(candidate.version()))
                    .filter(|candidate| !stable_only || candidate.version().is_stable())
                    .collect();
                if matches.is_empty() {
                    return Err(no_match());
                }
                matches.sort_by(|a, b| a.version().cmp(b.version()));
                Ok(matches)
            }
        }
    }

    /// The greatest candidate `spec` selects.
    ///
    /// # Errors
    /// Same as [`Resolver::resolve_all`].
    pub fn resolve<'a, T: Versioned>(
        &self,
        spec: &VersionSpec,
        universe: &'a [T],
    ) -> Result<&'a T, ResolutionError> {
        self.resolve_all(spec, universe)?
            .pop()
            .ok_or_else(|| ResolutionError::NoMatch {
                spec: spec.to_string(),
            })
    }

    /// Check that defining `name -> target` would not close a cycle.
    ///
    /// Targets naming an alias that does not exist yet are accepted.
    ///
    /// # Errors
    /// Returns [`ResolutionError::AliasCycle`] if the new definition reaches
    /// `name` again.
    pub fn check_alias(&self, name: &str, target: &VersionSpec) -> Result<(), ResolutionError> {
        let mut candidate = self.aliases.clone();
        candidate.insert(name.to_string(), target.clone());

        match Self::new(candidate).expand(&VersionSpec::Alias(name.to_string())) {
            Err(error @ ResolutionError::AliasCycle { .. }) => Err(error),
            Ok(_) | Err(_) => Ok(()),
        }
    }
}
