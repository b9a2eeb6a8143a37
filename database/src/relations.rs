//! One-to-many relationships.
//!
//! A child declares which parent column its foreign key points at. The
//! parent side then gets a lazily loaded collection and an `append` that
//! fills in the foreign key, so a child can be attached either by setting
//! the key directly or through the parent.

use crate::base::{QueryContext, Session};
use crate::crud::{find_all_by, find_one_by, Crud, KeyValue, Model};
use crate::errors::{Error, Result};

#[allow(async_fn_in_trait)]
pub trait BelongsTo<P: Model>: Model {
    type Key: Clone + Into<KeyValue>;

    /// Foreign key column on the child table.
    const FOREIGN_KEY: &'static str;
    /// Column of the parent table the foreign key references.
    const REFERENCES: &'static str = "id";

    /// Value of the referenced parent column, if the parent has one yet.
    fn referenced_key(parent: &P) -> Option<Self::Key>;

    fn foreign_key(&self) -> Option<Self::Key>;

    fn set_foreign_key(&mut self, key: Self::Key);

    /// Loads the parent this child points at.
    async fn parent<'c>(&self, ctx: impl Into<QueryContext<'c>>) -> Result<Option<P>> {
        match self.foreign_key() {
            Some(key) => find_one_by::<P>(Self::REFERENCES, key, ctx).await,
            None => Ok(None),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Parent: Model {
    /// Children of type `C` currently pointing at this record, by id.
    async fn children<'c, C: BelongsTo<Self>>(
        &self,
        ctx: impl Into<QueryContext<'c>>,
    ) -> Result<Vec<C>> {
        match C::referenced_key(self) {
            Some(key) => find_all_by::<C>(C::FOREIGN_KEY, key, ctx).await,
            None => Ok(Vec::new()),
        }
    }

    /// Attaches `child` to this record and saves it. An unsaved parent is
    /// saved first, in the same session.
    async fn append<C: BelongsTo<Self>>(
        &mut self,
        session: &mut Session,
        child: &mut C,
        commit: bool,
    ) -> Result<()> {
        if self.id().is_none() {
            self.save(session, false).await?;
        }
        let key = C::referenced_key(self).ok_or_else(|| {
            Error::Validation(format!(
                "{} has no value for {}.{}",
                Self::NAME,
                Self::TABLE,
                C::REFERENCES
            ))
        })?;
        child.set_foreign_key(key);
        child.save(session, commit).await?;
        Ok(())
    }
}

impl<P: Model> Parent for P {}
