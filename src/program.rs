//! Per-link program state: the uniform storage table, the location remap
//! table, the public resource list, and the diagnostic log.

use std::fmt::{self, Write as _};

use crate::{
    define_index,
    ir::{ShaderStage, StageMask, StageModule, StageProgram, Type, STAGE_COUNT},
    newtypes::IndexVec,
    resources::ProgramResource,
};

// === Uniform storage === //

define_index! {
    pub struct UniformId: u32;
}

/// Per-stage opaque (sampler/image) binding of a uniform storage entry.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct OpaqueBinding {
    pub active: bool,
    pub index: u32,
}

/// One leaf (non-aggregate) uniform value, shared across every stage that
/// declares it.
#[derive(Debug, Clone)]
pub struct UniformStorage {
    pub name: String,
    /// Element type if the uniform was declared as an array.
    pub ty: Type,
    /// Declared array length; zero for non-arrays.
    pub array_elements: u32,
    /// Base location in the remap table; `None` until assigned.
    pub remap_location: Option<u32>,
    pub active_stages: StageMask,
    pub opaque: [OpaqueBinding; STAGE_COUNT],
    /// Offset into the shared uniform data buffer, in scalar components.
    pub storage_offset: u32,
    pub builtin: bool,
    pub is_shader_storage: bool,
}

impl UniformStorage {
    /// Number of remap-table slots this entry occupies.
    pub fn entries(&self) -> u32 {
        self.array_elements.max(1)
    }
}

// === ShaderProgram === //

#[derive(Debug, Clone)]
pub struct LinkedStage {
    pub module: StageModule,
    pub program: StageProgram,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LinkStatus {
    #[default]
    None,
    Success,
    Failure,
}

/// A program being linked. All tables are rebuilt from scratch on every link
/// of this program; nothing persists across unrelated programs.
#[derive(Debug, Default)]
pub struct ShaderProgram {
    pub stages: [Option<LinkedStage>; STAGE_COUNT],

    pub uniform_storage: IndexVec<UniformId, UniformStorage>,
    /// Location -> storage entry table; sparse slots are `None`.
    pub remap_table: Vec<Option<UniformId>>,
    /// Total scalar components backing the default uniform block.
    pub num_uniform_data_slots: u32,

    pub resource_list: Vec<ProgramResource>,

    pub info_log: String,
    pub status: LinkStatus,
}

impl ShaderProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, module: StageModule) {
        let stage = module.stage;
        self.stages[stage.index()] = Some(LinkedStage {
            module,
            program: StageProgram::default(),
        });
    }

    pub fn stage(&self, stage: ShaderStage) -> Option<&LinkedStage> {
        self.stages[stage.index()].as_ref()
    }

    /// O(1) location -> storage entry lookup through the remap table.
    pub fn uniform_at_location(&self, location: u32) -> Option<&UniformStorage> {
        let id = (*self.remap_table.get(location as usize)?)?;
        Some(&self.uniform_storage[id])
    }

    /// Appends to the info log and trips the failure flag. Fatal conditions
    /// abandon the rest of the current link call; partial tables are left in
    /// place, not rolled back.
    pub fn linker_error(&mut self, msg: impl fmt::Display) {
        let _ = writeln!(self.info_log, "error: {msg}");
        self.status = LinkStatus::Failure;
    }
}
