//! The frozen per-stage intermediate representation the linker consumes.
//!
//! Each stage owns an arena of [`Variable`]s plus per-mode index sets; the
//! linker only ever retags variables (e.g. demoting a dead varying to
//! [`VarMode::Global`]) and moves their ids between sets. Instructions are
//! exposed only as far as the linker needs them: variable loads and stores.

use std::ops;

use crate::{define_index, newtypes::IndexVec};

// === Stages === //

pub const STAGE_COUNT: usize = 6;

/// First interface slot that is a user-declared "generic" varying; everything
/// below is a built-in and is never eliminated.
pub const FIRST_GENERIC_SLOT: u32 = 32;

/// Base of the per-patch slot space. Patch varyings are numbered relative to
/// this rather than to slot zero.
pub const PATCH_SLOT_BASE: u32 = 64;

pub const MAX_SAMPLERS: u32 = 32;
pub const MAX_IMAGE_UNIFORMS: u32 = 8;

/// One unit of the shader pipeline, in pipeline order.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum ShaderStage {
    Vertex,
    TessCtrl,
    TessEval,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; STAGE_COUNT] = [
        ShaderStage::Vertex,
        ShaderStage::TessCtrl,
        ShaderStage::TessEval,
        ShaderStage::Geometry,
        ShaderStage::Fragment,
        ShaderStage::Compute,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bit(self) -> StageMask {
        StageMask(1 << self.index())
    }
}

/// Bitset over pipeline stages, one bit per [`ShaderStage`].
#[derive(Debug, Copy, Clone, Default, Hash, Eq, PartialEq)]
pub struct StageMask(pub u8);

impl StageMask {
    pub const EMPTY: Self = Self(0);

    pub fn contains(self, stage: ShaderStage) -> bool {
        self.0 & stage.bit().0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl ops::BitOr for StageMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for StageMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// === Types === //

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum ScalarKind {
    Float,
    Int,
    Uint,
    Bool,
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum TextureDim {
    D1,
    D2,
    D3,
    Cube,
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum ImageAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Scalar(ScalarKind),
    Vector { kind: ScalarKind, size: u8 },
    Matrix { columns: u8, rows: u8 },
    Array { element: Box<Type>, len: u32 },
    Struct { fields: Vec<StructField> },
    Sampler { dim: TextureDim, shadow: bool },
    Image { dim: TextureDim, access: ImageAccess },
}

impl Type {
    pub fn float() -> Self {
        Type::Scalar(ScalarKind::Float)
    }

    pub fn vec4() -> Self {
        Type::Vector {
            kind: ScalarKind::Float,
            size: 4,
        }
    }

    pub fn array(element: Type, len: u32) -> Self {
        Type::Array {
            element: Box::new(element),
            len,
        }
    }

    /// Number of contiguous interface slots a value of this type occupies.
    /// Matrices take one slot per column; arrays multiply their element's
    /// slot count; structs sum their fields.
    pub fn attribute_slots(&self) -> u32 {
        match self {
            Type::Scalar(_) | Type::Vector { .. } | Type::Sampler { .. } | Type::Image { .. } => 1,
            Type::Matrix { columns, .. } => u32::from(*columns),
            Type::Array { element, len } => len * element.attribute_slots(),
            Type::Struct { fields } => fields.iter().map(|f| f.ty.attribute_slots()).sum(),
        }
    }

    /// Number of scalar components backing a value of this type in the
    /// uniform data buffer. Opaque types count as a single component.
    pub fn component_slots(&self) -> u32 {
        match self {
            Type::Scalar(_) | Type::Sampler { .. } | Type::Image { .. } => 1,
            Type::Vector { size, .. } => u32::from(*size),
            Type::Matrix { columns, rows } => u32::from(*columns) * u32::from(*rows),
            Type::Array { element, len } => len * element.component_slots(),
            Type::Struct { fields } => fields.iter().map(|f| f.ty.component_slots()).sum(),
        }
    }

    /// Outer length of the type: array length for arrays, field count for
    /// structs, zero otherwise.
    pub fn length(&self) -> u32 {
        match self {
            Type::Array { len, .. } => *len,
            Type::Struct { fields } => fields.len() as u32,
            _ => 0,
        }
    }

    pub fn without_array(&self) -> &Type {
        match self {
            Type::Array { element, .. } => element,
            other => other,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct { .. })
    }
}

// === Variables === //

define_index! {
    pub struct VarId: u32;
}

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum VarMode {
    Input,
    Output,
    Uniform,
    SystemValue,
    Global,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: Option<String>,
    pub ty: Type,
    pub mode: VarMode,
    /// Interface slot; negative means unassigned.
    pub location: i32,
    /// Sub-slot component, 0 to 3.
    pub location_frac: u8,
    /// Tessellation per-patch rather than per-vertex.
    pub patch: bool,
    /// Exempt from unused-varying elimination.
    pub always_active_io: bool,
}

impl Variable {
    pub fn new(name: &str, ty: Type, mode: VarMode, location: i32) -> Self {
        Self {
            name: Some(name.to_owned()),
            ty,
            mode,
            location,
            location_frac: 0,
            patch: false,
            always_active_io: false,
        }
    }
}

/// The slice of the instruction stream the linker looks at.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum Instruction {
    Load(VarId),
    Store(VarId),
}

// === StageModule === //

/// One stage's frozen IR: a variable arena, per-mode index sets, and the
/// instruction stream.
#[derive(Debug, Clone, Default)]
pub struct StageModuleSets {
    pub inputs: Vec<VarId>,
    pub outputs: Vec<VarId>,
    pub uniforms: Vec<VarId>,
    pub system_values: Vec<VarId>,
    pub globals: Vec<VarId>,
}

#[derive(Debug, Clone)]
pub struct StageModule {
    pub stage: ShaderStage,
    pub variables: IndexVec<VarId, Variable>,
    pub sets: StageModuleSets,
    pub instructions: Vec<Instruction>,
}

impl StageModule {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            variables: IndexVec::new(),
            sets: StageModuleSets::default(),
            instructions: Vec::new(),
        }
    }

    pub fn declare(&mut self, var: Variable) -> VarId {
        let mode = var.mode;
        let id = self.variables.push(var);
        self.set_for_mut(mode).push(id);
        id
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id]
    }

    fn set_for_mut(&mut self, mode: VarMode) -> &mut Vec<VarId> {
        match mode {
            VarMode::Input => &mut self.sets.inputs,
            VarMode::Output => &mut self.sets.outputs,
            VarMode::Uniform => &mut self.sets.uniforms,
            VarMode::SystemValue => &mut self.sets.system_values,
            VarMode::Global => &mut self.sets.globals,
        }
    }

    /// Retags an interface variable as a plain global and moves its id out of
    /// its interface set. One-way for the duration of a link.
    pub fn demote_to_global(&mut self, id: VarId) {
        let old_mode = self.variables[id].mode;
        self.variables[id].mode = VarMode::Global;
        self.variables[id].location = 0;

        let set = self.set_for_mut(old_mode);
        set.retain(|&v| v != id);
        self.sets.globals.push(id);
    }

    /// Inputs of tessellation/geometry stages and outputs of the
    /// tessellation-control stage are arrayed per vertex; slot counting peels
    /// one array level off them. Patch varyings and non-arrayed variables are
    /// never per-vertex.
    pub fn is_per_vertex_io(&self, var: &Variable) -> bool {
        if var.patch || !var.ty.is_array() {
            return false;
        }

        match (var.mode, self.stage) {
            (
                VarMode::Input,
                ShaderStage::TessCtrl | ShaderStage::TessEval | ShaderStage::Geometry,
            ) => true,
            (VarMode::Output, ShaderStage::TessCtrl) => true,
            _ => false,
        }
    }
}

// === StageProgram === //

/// Per-stage program object that receives side-effect writes during uniform
/// linking.
#[derive(Debug, Clone)]
pub struct StageProgram {
    pub samplers_used: u32,
    pub shadow_samplers: u32,
    pub sampler_targets: [Option<TextureDim>; MAX_SAMPLERS as usize],
    pub image_access: [Option<ImageAccess>; MAX_IMAGE_UNIFORMS as usize],
    pub num_textures: u32,
    pub num_images: u32,
    pub num_uniform_components: u32,
}

impl Default for StageProgram {
    fn default() -> Self {
        Self {
            samplers_used: 0,
            shadow_samplers: 0,
            sampler_targets: [None; MAX_SAMPLERS as usize],
            image_access: [None; MAX_IMAGE_UNIFORMS as usize],
            num_textures: 0,
            num_images: 0,
            num_uniform_components: 0,
        }
    }
}
