//! Kernel catalog.
//!
//! Immutable registry of every precompiled kernel the dispatch layer may
//! select. Built once on first use and never mutated afterwards.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;
use once_cell::sync::Lazy;

use super::id::{BinaryOp, KernelId, KernelOp, OperandKind, UnaryOp};
use super::params::{Packing, WorkgroupDims};
use crate::error::{ArrayError, ArrayResult};

static CATALOG: Lazy<KernelCatalog> = Lazy::new(KernelCatalog::build);

/// Dispatch information for one kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSpec {
    pub id: KernelId,
    /// Name of the precompiled device program.
    pub name: String,
    pub packing: Packing,
    pub workgroup: WorkgroupDims,
    pub buffer_count: usize,
}

impl KernelSpec {
    fn new(id: KernelId) -> Self {
        let (packing, workgroup) = match id.op {
            KernelOp::MatMul => (Packing::MatMul, WorkgroupDims::matmul()),
            _ => (
                // Operand kinds carry at most two scalars.
                match id.operands.scalars() {
                    0 => Packing::Vector,
                    1 => Packing::VectorScalar,
                    _ => Packing::VectorScalar2,
                },
                WorkgroupDims::elementwise(),
            ),
        };

        Self {
            id,
            name: id.name(),
            packing,
            workgroup,
            buffer_count: id.buffer_count(),
        }
    }
}

/// Mapping from kernel id to dispatch information.
#[derive(Debug)]
pub struct KernelCatalog {
    entries: HashMap<KernelId, KernelSpec>,
}

impl KernelCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static KernelCatalog {
        &CATALOG
    }

    /// Looks up a kernel.
    pub fn get(&self, id: &KernelId) -> ArrayResult<&KernelSpec> {
        self.entries.get(id).ok_or_else(|| {
            ArrayError::unsupported(alloc::format!("no kernel `{id}` in the catalog"))
        })
    }

    pub fn contains(&self, id: &KernelId) -> bool {
        self.entries.contains_key(id)
    }

    /// Looks up a kernel by its device program name.
    pub fn find(&self, name: &str) -> Option<&KernelSpec> {
        self.entries.values().find(|spec| spec.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by kernel id.
    pub fn specs(&self) -> Vec<&KernelSpec> {
        let mut specs: Vec<&KernelSpec> = self.entries.values().collect();
        specs.sort_by_key(|spec| spec.id);
        specs
    }

    fn build() -> Self {
        let mut ids = Vec::new();

        for op in BinaryOp::ALL {
            for in_place in [false, true] {
                ids.push(KernelId::binary(op, OperandKind::VV, in_place));
                ids.push(KernelId::binary(op, OperandKind::VS, in_place));
            }
            // Scalar-op-array only exists out-of-place: the written buffer
            // would have to be the scalar.
            if !op.is_commutative() {
                ids.push(KernelId::binary(op, OperandKind::SV, false));
            }
        }

        for op in UnaryOp::ALL {
            ids.push(KernelId::unary(op, false));
            ids.push(KernelId::unary(op, true));
        }

        for bounds in [
            OperandKind::VVV,
            OperandKind::VSV,
            OperandKind::VVS,
            OperandKind::VSS,
        ] {
            ids.push(KernelId::clamp(bounds, false));
            ids.push(KernelId::clamp(bounds, true));
        }

        ids.push(KernelId::matmul());

        let entries = ids
            .into_iter()
            .map(|id| (id, KernelSpec::new(id)))
            .collect();

        Self { entries }
    }
}
