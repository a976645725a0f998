//! Targeted spot-check of a list of logical object paths.

use std::collections::HashMap;
use std::io::BufRead;

use tracing::info;

use vaudit_catalog::Catalog;
use vaudit_model::{CheckResult, ObjectKind, Status};

use crate::check::CheckContext;
use crate::report::ReportSink;
use crate::verify::ObjectVerifier;
use crate::{EngineError, Result, RunOptions};

/// Verifies every local replica of an externally supplied list of logical
/// object paths, one path per input line.
///
/// This check ignores the resource hierarchy structure entirely: it looks
/// up each object directly and filters its replicas by resource locality.
pub struct ObjectListCheck<'a> {
    ctx: CheckContext<'a>,
    /// Resource name to "is hosted on the audited server", built once per
    /// run.
    locality: HashMap<String, bool>,
}

impl<'a> ObjectListCheck<'a> {
    pub fn new(catalog: &'a dyn Catalog, options: RunOptions) -> Result<Self> {
        let ctx = CheckContext::new(catalog, options)?;
        let locality = ctx
            .catalog
            .resources()?
            .into_iter()
            .map(|r| {
                let local = r.location == ctx.options.fqdn;
                (r.name, local)
            })
            .collect();
        Ok(Self { ctx, locality })
    }

    pub fn run(&mut self, input: impl BufRead, sink: &mut dyn ReportSink) -> Result<()> {
        sink.head()?;
        info!("checking object list for consistency of local replicas");

        for line in input.lines() {
            let line = line?;
            let object_path = line.trim_end();
            if object_path.is_empty() {
                continue;
            }
            self.check_object(object_path, sink)?;
        }
        Ok(())
    }

    fn check_object(&mut self, object_path: &str, sink: &mut dyn ReportSink) -> Result<()> {
        let Some((collection_name, object_name)) = object_path.rsplit_once('/') else {
            return self.emit_bare(object_path, Status::NotFound, sink);
        };

        let Some(collection) = self.ctx.catalog.collection_by_name(collection_name)? else {
            return self.emit_bare(object_path, Status::NotFound, sink);
        };

        let replicas = self.ctx.catalog.replicas_of(collection.id, object_name)?;
        if replicas.is_empty() {
            return self.emit_bare(object_path, Status::NotFound, sink);
        }

        let mut found_local = false;
        for object in replicas {
            if !self
                .locality
                .get(&object.resource_name)
                .copied()
                .unwrap_or(false)
            {
                continue;
            }
            let resource = self
                .ctx
                .catalog
                .resource_by_name(&object.resource_name)?
                .ok_or_else(|| EngineError::ResourceNotFound(object.resource_name.clone()))?;
            let backend = self.ctx.backends.backend_for(&resource)?;
            let verifier = ObjectVerifier::new(backend.as_ref(), self.ctx.options.verify_checksums);
            sink.write(&verifier.verify(&object)?)?;
            found_local = true;
        }

        if !found_local {
            return self.emit_bare(object_path, Status::NoLocalReplica, sink);
        }
        Ok(())
    }

    fn emit_bare(
        &self,
        object_path: &str,
        status: Status,
        sink: &mut dyn ReportSink,
    ) -> Result<()> {
        let result = CheckResult::bare(ObjectKind::DataObject, object_path, "", status);
        sink.write(&result)?;
        Ok(())
    }
}
