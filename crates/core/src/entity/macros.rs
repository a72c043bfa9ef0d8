/// Declares the capabilities of an entity inside its `impl Entity` block.
///
/// Accepted names: `soft_delete`, `active_status`, `tenant`, `created_audit`,
/// `updated_audit`, `cache`. Each one overrides the matching accessor to
/// return `Some(self)`, so the entity must implement the capability trait.
///
/// ```
/// use repokit_core::entity::{Entity, HasSoftDelete};
/// use repokit_core::entity_capabilities;
/// use serde::{Deserialize, Serialize};
/// use uuid::Uuid;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Tag {
///     id: Uuid,
///     deleted: bool,
/// }
///
/// impl HasSoftDelete for Tag {
///     fn is_deleted(&self) -> bool {
///         self.deleted
///     }
///
///     fn set_deleted(&mut self, deleted: bool) {
///         self.deleted = deleted;
///     }
/// }
///
/// impl Entity for Tag {
///     type Id = Uuid;
///     const NAME: &'static str = "Tag";
///
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn set_id(&mut self, id: Uuid) {
///         self.id = id;
///     }
///
///     entity_capabilities!(soft_delete);
/// }
///
/// assert!(Tag::default().soft_delete().is_some());
/// ```
#[macro_export]
macro_rules! entity_capabilities {
    ($($capability:ident),+ $(,)?) => {
        $( $crate::__entity_capability!($capability); )+
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __entity_capability {
    (soft_delete) => {
        fn soft_delete(&self) -> ::core::option::Option<&dyn $crate::entity::HasSoftDelete> {
            ::core::option::Option::Some(self)
        }

        fn soft_delete_mut(
            &mut self,
        ) -> ::core::option::Option<&mut dyn $crate::entity::HasSoftDelete> {
            ::core::option::Option::Some(self)
        }
    };
    (active_status) => {
        fn active_status(&self) -> ::core::option::Option<&dyn $crate::entity::HasActiveStatus> {
            ::core::option::Option::Some(self)
        }

        fn active_status_mut(
            &mut self,
        ) -> ::core::option::Option<&mut dyn $crate::entity::HasActiveStatus> {
            ::core::option::Option::Some(self)
        }
    };
    (tenant) => {
        fn tenant(&self) -> ::core::option::Option<&dyn $crate::entity::HasTenant> {
            ::core::option::Option::Some(self)
        }

        fn tenant_mut(&mut self) -> ::core::option::Option<&mut dyn $crate::entity::HasTenant> {
            ::core::option::Option::Some(self)
        }
    };
    (created_audit) => {
        fn created_audit_mut(
            &mut self,
        ) -> ::core::option::Option<&mut dyn $crate::entity::HasCreatedAudit> {
            ::core::option::Option::Some(self)
        }
    };
    (updated_audit) => {
        fn updated_audit_mut(
            &mut self,
        ) -> ::core::option::Option<&mut dyn $crate::entity::HasUpdatedAudit> {
            ::core::option::Option::Some(self)
        }
    };
    (cache) => {
        fn cache(&self) -> ::core::option::Option<&dyn $crate::entity::HasCache> {
            ::core::option::Option::Some(self)
        }
    };
}
