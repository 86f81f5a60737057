//! Per-key version chains.
//!
//! A [`Chains`] holds every chain of one entity kind in one bucket. Each
//! chain is append-only and its ordinals run 0, 1, 2, ... without gaps, so
//! a version's ordinal is also its index. Alongside the chains sits an
//! insertion log recording every append across all keys; listing walks that
//! log, which gives the bucket-wide creation order.

use std::collections::HashMap;

use crepo_types::VersionId;

use crate::entity::Versioned;
use crate::query::ListQuery;

#[derive(Debug)]
pub(crate) struct Chains<E> {
    chains: HashMap<String, Vec<E>>,
    log: Vec<(String, u32)>,
}

impl<E> Default for Chains<E> {
    fn default() -> Self {
        Self {
            chains: HashMap::new(),
            log: Vec::new(),
        }
    }
}

impl<E: Versioned> Chains<E> {
    /// Whether `key` has at least one version, in any status.
    pub fn contains_key(&self, key: &str) -> bool {
        self.chains.get(key).is_some_and(|c| !c.is_empty())
    }

    /// The full chain of `key` in creation order; empty if the key is unknown.
    pub fn chain(&self, key: &str) -> &[E] {
        self.chains.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Ordinal the next version of `key` will receive.
    pub fn next_number(&self, key: &str) -> u32 {
        self.chain(key)
            .last()
            .map_or(0, |last| last.core().number + 1)
    }

    /// Append a version built for ordinal `next_number(key)`.
    pub fn append(&mut self, key: &str, entity: E) -> &E {
        let number = entity.core().number;
        debug_assert_eq!(number, self.next_number(key), "ordinal gap in chain {key}");
        self.log.push((key.to_string(), number));
        let chain = self.chains.entry(key.to_string()).or_default();
        chain.push(entity);
        &chain[chain.len() - 1]
    }

    /// Newest version whose status is `Used`.
    ///
    /// This is a reverse scan, not "highest ordinal": deleting the newest
    /// version exposes the next older live one.
    pub fn latest(&self, key: &str) -> Option<&E> {
        self.chain(key)
            .iter()
            .rev()
            .find(|e| e.core().status.is_used())
    }

    pub fn latest_mut(&mut self, key: &str) -> Option<&mut E> {
        self.chains
            .get_mut(key)?
            .iter_mut()
            .rev()
            .find(|e| e.core().status.is_used())
    }

    pub fn by_version(&self, key: &str, version_id: VersionId) -> Option<&E> {
        self.chain(key)
            .iter()
            .find(|e| e.core().locator.version_id() == version_id)
    }

    pub fn by_version_mut(&mut self, key: &str, version_id: VersionId) -> Option<&mut E> {
        self.chains
            .get_mut(key)?
            .iter_mut()
            .find(|e| e.core().locator.version_id() == version_id)
    }

    pub fn by_number(&self, key: &str, number: u32) -> Option<&E> {
        self.chain(key).get(number as usize)
    }

    pub fn by_number_mut(&mut self, key: &str, number: u32) -> Option<&mut E> {
        self.chains.get_mut(key)?.get_mut(number as usize)
    }

    /// First version in chain order carrying `tag`, whatever its status.
    pub fn by_tag(&self, key: &str, tag: &str) -> Option<&E> {
        self.chain(key)
            .iter()
            .find(|e| e.core().tag.as_deref() == Some(tag))
    }

    /// Total versions across all keys.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Every version across all keys, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.log
            .iter()
            .filter_map(|(key, number)| self.by_number(key, *number))
    }

    /// One page of versions passing the query's filter, in insertion order.
    pub fn page<'a>(&'a self, query: &'a ListQuery) -> impl Iterator<Item = &'a E> + 'a {
        self.iter()
            .filter(move |e| {
                let core = e.core();
                query.matches(core.status, core.tag.as_deref())
            })
            .skip(query.offset)
            .take(query.limit)
    }
}
