// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signing relationships derived from the latest certificate versions.
//!
//! An edge `ca -> leaf` exists when the leaf's latest version records `ca` as
//! its signer. Versions without a recorded signer fall back to matching their
//! issuer DN against the CA's latest subject DN. Self-signed versions have no
//! incoming edge. Nothing here is persisted; the index is rebuilt for every
//! bulk regeneration.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use strongbox_core::{CertificateSummary, CredentialName, RegenerationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

#[derive(Debug, Default, Clone)]
pub struct SigningGraphIndex {
    subjects: BTreeMap<CredentialName, String>,
    signed_by: HashMap<CredentialName, BTreeSet<CredentialName>>,
    issued_by: HashMap<String, BTreeSet<CredentialName>>,
}

impl SigningGraphIndex {
    pub fn build(certificates: impl IntoIterator<Item = CertificateSummary>) -> Self {
        let mut index = Self::default();
        for cert in certificates {
            let metadata = cert.metadata;
            if !metadata.self_signed {
                match metadata.signer_name {
                    Some(signer) => {
                        index.signed_by.entry(signer).or_default().insert(cert.name.clone());
                    }
                    None => {
                        index
                            .issued_by
                            .entry(metadata.issuer)
                            .or_default()
                            .insert(cert.name.clone());
                    }
                }
            }
            index.subjects.insert(cert.name, metadata.subject);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Names directly signed by `ca_name`, sorted, never `ca_name` itself.
    pub fn dependents_of(&self, ca_name: &CredentialName) -> Vec<CredentialName> {
        let Some(subject) = self.subjects.get(ca_name) else {
            return Vec::new();
        };
        let by_name = self.signed_by.get(ca_name).into_iter().flatten();
        let by_issuer = self.issued_by.get(subject).into_iter().flatten();
        by_name
            .chain(by_issuer)
            .filter(|n| *n != ca_name)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Fail with `SigningGraphCycle` if any cycle is reachable from `root`.
    pub fn check_acyclic(&self, root: &CredentialName) -> Result<(), RegenerationError> {
        let mut marks = HashMap::new();
        let mut path = Vec::new();
        self.visit(root, &mut marks, &mut path)
    }

    fn visit(
        &self,
        node: &CredentialName,
        marks: &mut HashMap<CredentialName, Mark>,
        path: &mut Vec<CredentialName>,
    ) -> Result<(), RegenerationError> {
        match marks.get(node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|n| n == node).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(node.to_string());
                return Err(RegenerationError::SigningGraphCycle { path: cycle });
            }
            None => {}
        }

        marks.insert(node.clone(), Mark::InProgress);
        path.push(node.clone());
        for child in self.dependents_of(node) {
            self.visit(&child, marks, path)?;
        }
        path.pop();
        marks.insert(node.clone(), Mark::Done);
        Ok(())
    }

    /// Transitive dependents of `root` in depth-first pre-order, children
    /// lexicographically. Each name appears once; `root` is not included.
    pub fn cascade_order(&self, root: &CredentialName) -> Vec<CredentialName> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::from([root.clone()]);
        let mut stack: Vec<CredentialName> = self.dependents_of(root).into_iter().rev().collect();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependents_of(&name).into_iter().rev());
            order.push(name);
        }
        order
    }
}
