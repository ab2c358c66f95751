//! Selection of the metadata references a compilation context is built from.
//!
//! An evaluation context either sees every loaded assembly ([`MetadataContextId::Shared`]) or
//! only what the target module references ([`MetadataContextId::Module`]). The second form is
//! what the retry loop falls back to when the compiler reports the same type in two
//! assemblies.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::metadata::{
    block::MetadataBlock, identity::AssemblyIdentity, resolver::AssemblyReferenceResolver,
    snapshot::MetadataSnapshot,
};

/// Which assemblies a reference set contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ReferenceKind {
    /// Every loaded assembly
    AllAssemblies,
    /// The target module and everything it transitively references
    AllReferences,
    /// The target module and its direct references
    DirectReferencesOnly,
}

/// Key of a cached evaluation context within a scope's cache slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataContextId {
    /// The context sees all loaded assemblies
    Shared,
    /// The context sees only what the module with this mvid references
    Module(uguid::Guid),
}

impl MetadataContextId {
    /// The cache key for a reference set of `kind` built for module `mvid`
    #[must_use]
    pub fn for_kind(kind: ReferenceKind, mvid: uguid::Guid) -> Self {
        match kind {
            ReferenceKind::AllAssemblies => MetadataContextId::Shared,
            ReferenceKind::AllReferences | ReferenceKind::DirectReferencesOnly => {
                MetadataContextId::Module(mvid)
            }
        }
    }
}

/// One block selected for a compilation, with the assembly it defines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReference<'a> {
    /// The metadata
    pub block: MetadataBlock<'a>,
    /// The defined assembly, `None` for netmodules and blocks with corrupt assembly tables
    pub identity: Option<AssemblyIdentity>,
}

/// The references handed to the compiler when creating a context.
#[derive(Debug, Clone)]
pub struct AssemblyReferences<'a> {
    /// How the set was selected
    pub kind: ReferenceKind,
    /// Module the set was built for
    pub target: uguid::Guid,
    /// Selected references, target module first
    pub references: Vec<MetadataReference<'a>>,
    resolver: AssemblyReferenceResolver<usize>,
}

impl<'a> AssemblyReferences<'a> {
    /// The cache key matching this set
    #[must_use]
    pub fn context_id(&self) -> MetadataContextId {
        MetadataContextId::for_kind(self.kind, self.target)
    }

    /// Best selected reference defining `identity`, for unification during binding
    #[must_use]
    pub fn resolve(&self, identity: &AssemblyIdentity) -> Option<&MetadataReference<'a>> {
        let (_, index) = self.resolver.resolve_missing_assembly(identity)?;
        self.references.get(*index)
    }

    /// The selected blocks, in order
    pub fn blocks(&self) -> impl Iterator<Item = &MetadataBlock<'a>> {
        self.references.iter().map(|reference| &reference.block)
    }
}

struct Candidate<'s, 'a> {
    block: &'s MetadataBlock<'a>,
    identity: Option<AssemblyIdentity>,
    references: Vec<AssemblyIdentity>,
}

impl<'a> MetadataSnapshot<'a> {
    /// Select the references for compiling in module `mvid`.
    ///
    /// The target module always comes first. Corlib (the assembly without references) and the
    /// intrinsics block are always included. Copies of an assembly that is already selected are
    /// dropped. If `mvid` is not part of the snapshot every block is selected.
    #[must_use]
    pub fn make_assembly_references(
        &self,
        mvid: uguid::Guid,
        kind: ReferenceKind,
    ) -> AssemblyReferences<'a> {
        let candidates: Vec<Candidate<'_, 'a>> = self
            .blocks()
            .iter()
            .map(|block| match block.assembly_info() {
                Ok(info) => Candidate {
                    block,
                    identity: info.identity,
                    references: info.references,
                },
                Err(error) => {
                    debug!(module = block.name(), %error, "treating block as plain module");
                    Candidate {
                        block,
                        identity: None,
                        references: Vec::new(),
                    }
                }
            })
            .collect();

        let intrinsics = candidates.len().saturating_sub(1);
        let target = candidates[..intrinsics]
            .iter()
            .position(|candidate| candidate.block.module_version_id() == mvid);

        let mut resolver = AssemblyReferenceResolver::new();
        for (index, candidate) in candidates[..intrinsics].iter().enumerate() {
            if let Some(identity) = &candidate.identity {
                resolver.add(identity.clone(), index);
            }
        }

        let (kind, order) = match (target, kind) {
            (None, _) => {
                debug!(%mvid, "target module not in snapshot, selecting all blocks");
                (ReferenceKind::AllAssemblies, (0..candidates.len()).collect())
            }
            (Some(target), ReferenceKind::AllAssemblies) => {
                let mut order = vec![target];
                order.extend((0..candidates.len()).filter(|index| *index != target));
                (kind, order)
            }
            (Some(target), _) => {
                let mut order = vec![target];
                let mut queue = VecDeque::from([target]);
                let mut visited = HashSet::from([target]);

                while let Some(current) = queue.pop_front() {
                    for reference in &candidates[current].references {
                        let Some((_, index)) = resolver.resolve_missing_assembly(reference) else {
                            continue;
                        };
                        if visited.insert(*index) {
                            order.push(*index);
                            if kind == ReferenceKind::AllReferences {
                                queue.push_back(*index);
                            }
                        }
                    }
                }

                let corlib = candidates[..intrinsics].iter().position(|candidate| {
                    candidate.identity.is_some() && candidate.references.is_empty()
                });
                order.extend(corlib.filter(|index| visited.insert(*index)));
                order.push(intrinsics);
                (kind, order)
            }
        };

        let mut seen = HashSet::new();
        let mut references = Vec::with_capacity(order.len());
        let mut selected = AssemblyReferenceResolver::new();
        for index in order {
            let candidate = &candidates[index];
            if let Some(identity) = &candidate.identity {
                if !seen.insert(identity.clone()) {
                    debug!(assembly = %identity, "dropping duplicate assembly");
                    continue;
                }
                selected.add(identity.clone(), references.len());
            }

            references.push(MetadataReference {
                block: candidate.block.clone(),
                identity: candidate.identity.clone(),
            });
        }

        AssemblyReferences {
            kind,
            target: mvid,
            references,
            resolver: selected,
        }
    }
}
