//! Rendering of upload-scoped predicates into `sqlx::QueryBuilder`.
//!
//! Column names are compile-time constants supplied by
//! [`crate::sqlite_store`]; every value (upload ids, local ids) is pushed
//! with `push_bind` and never appears in the SQL text.

use sqlx::{Encode, QueryBuilder, Sqlite, Type};
use xiview_data_core::compose::KeyBatch;
use xiview_data_core::keys::UploadId;

/// `<column> IN (?, ?, ...)` over the upload set.
///
/// An empty set renders a predicate that matches nothing rather than an
/// empty `IN ()` list.
pub fn push_upload_filter(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, uploads: &[UploadId]) {
    if uploads.is_empty() {
        builder.push("0 = 1");
        return;
    }
    builder.push(column).push(" IN (");
    let mut separated = builder.separated(", ");
    for upload in uploads {
        separated.push_bind(upload.get());
    }
    separated.push_unseparated(")");
}

/// `((<upload> = ? AND <id> IN (?, ...)) OR ...)` for one batch.
pub fn push_scoped_filter<'args, T>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    upload_column: &str,
    id_column: &str,
    batch: &KeyBatch<'_, T>,
) where
    T: Clone + PartialEq + Encode<'args, Sqlite> + Type<Sqlite> + 'args,
{
    builder.push("(");
    for (i, group) in batch.groups().iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder
            .push("(")
            .push(upload_column)
            .push(" = ")
            .push_bind(group.upload_id.get())
            .push(" AND ")
            .push(id_column)
            .push(" IN (");
        let mut ids = builder.separated(", ");
        for id in &group.local_ids {
            ids.push_bind((*id).clone());
        }
        ids.push_unseparated("))");
    }
    builder.push(")");
}
