use rewind_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{Blob, Commit, ObjectKind, StoredObject, TagObject, Tree};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same data always produces the
///   same ID.
/// - Concurrent reads are always safe (objects are immutable).
/// - The store never interprets object contents; the typed readers below do.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read an object that must exist.
    fn read_required(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(StoreError::NotFound(*id))
    }

    /// Kind of an object, or `None` if it does not exist.
    ///
    /// The canonical empty tree always reports [`ObjectKind::Tree`].
    fn kind_of(&self, id: &ObjectId) -> StoreResult<Option<ObjectKind>> {
        match self.read(id)? {
            Some(obj) => Ok(Some(obj.kind)),
            None if *id == Tree::empty_id() => Ok(Some(ObjectKind::Tree)),
            None => Ok(None),
        }
    }

    /// Read and decode a tree.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        match self.read(id)? {
            Some(obj) => Tree::from_stored_object(&obj),
            None if *id == Tree::empty_id() => Ok(Tree::empty()),
            None => Err(StoreError::NotFound(*id)),
        }
    }

    /// Read and decode a commit.
    fn read_commit(&self, id: &ObjectId) -> StoreResult<Commit> {
        Commit::from_stored_object(&self.read_required(id)?)
    }

    /// Read and decode an annotated tag.
    fn read_tag(&self, id: &ObjectId) -> StoreResult<TagObject> {
        TagObject::from_stored_object(&self.read_required(id)?)
    }

    /// Read a blob's raw content.
    fn read_blob(&self, id: &ObjectId) -> StoreResult<Vec<u8>> {
        if *id == Blob::empty_id() {
            return Ok(Vec::new());
        }
        Ok(Blob::from_stored_object(&self.read_required(id)?)?.data)
    }

    /// Encode and write a tree.
    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }

    /// Encode and write a commit.
    fn write_commit(&self, commit: &Commit) -> StoreResult<ObjectId> {
        self.write(&commit.to_stored_object()?)
    }

    /// Write a blob holding `data`.
    fn write_blob(&self, data: &[u8]) -> StoreResult<ObjectId> {
        self.write(&Blob::new(data.to_vec()).to_stored_object())
    }
}
