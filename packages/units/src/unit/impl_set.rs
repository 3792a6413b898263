use super::ImplId;
use crate::ccimpl::{CCImpl, CCImplOps};
use zwave_core::prelude::*;

/// Owns the capabilities of a unit. Each one is addressed by the id it got when it was adopted.
#[derive(Default)]
pub struct ImplSet {
    impls: Vec<CCImpl>,
}

impl ImplSet {
    /// Takes ownership of a capability and assigns its id
    ///
    /// # Panics
    /// If the set already holds 256 capabilities
    pub fn adopt(&mut self, mut imp: CCImpl) -> ImplId {
        let Ok(index) = u8::try_from(self.impls.len()) else {
            panic!("too many capabilities in one unit");
        };
        let id = ImplId(index);
        imp.core_mut().set_id(id);
        self.impls.push(imp);
        id
    }

    pub fn get(&self, id: ImplId) -> Option<&CCImpl> {
        self.impls.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ImplId) -> Option<&mut CCImpl> {
        self.impls.get_mut(id.0 as usize)
    }

    /// The first capability for the class and end point
    pub fn find(&self, class: CommandClasses, endpoint: EndpointIndex) -> Option<ImplId> {
        self.impls
            .iter()
            .find(|imp| imp.class() == class && imp.endpoint() == endpoint)
            .map(|imp| imp.core().id())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CCImpl> {
        self.impls.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CCImpl> {
        self.impls.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.impls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impls.is_empty()
    }
}
