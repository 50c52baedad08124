//! The public, query-ordered program resource table.

use rustc_hash::FxHashMap;

use crate::{
    ir::{ShaderStage, StageMask, Type, VarId},
    program::{ShaderProgram, UniformId},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Uniform,
    ProgramInput,
}

/// Snapshot of a vertex-stage input exposed through the resource list.
#[derive(Debug, Clone, PartialEq)]
pub struct InputVariable {
    pub name: String,
    pub ty: Type,
    pub location: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceData {
    Uniform(UniformId),
    Input(InputVariable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramResource {
    pub kind: ResourceKind,
    pub data: ResourceData,
    pub stages: StageMask,
}

/// Stable identity of a resource's underlying data. Re-adding the same
/// identity only ORs stage bits; it never grows the list.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
enum ResourceKey {
    Uniform(UniformId),
    Input(ShaderStage, VarId),
}

fn add_program_resource(
    list: &mut Vec<ProgramResource>,
    seen: &mut FxHashMap<ResourceKey, usize>,
    key: ResourceKey,
    data: ResourceData,
    stages: StageMask,
) {
    if let Some(&existing) = seen.get(&key) {
        list[existing].stages |= stages;
        return;
    }

    let kind = match data {
        ResourceData::Uniform(_) => ResourceKind::Uniform,
        ResourceData::Input(_) => ResourceKind::ProgramInput,
    };

    seen.insert(key, list.len());
    list.push(ProgramResource { kind, data, stages });
}

/// Rebuilds the resource list from scratch: one `Uniform` resource per
/// storage entry, then one `ProgramInput` resource per vertex-stage input.
/// Expects `link_uniforms` to have run already.
pub fn build_program_resource_list(prog: &mut ShaderProgram) {
    prog.resource_list.clear();

    let mut seen = FxHashMap::default();

    for (id, uniform) in prog.uniform_storage.enumerate() {
        add_program_resource(
            &mut prog.resource_list,
            &mut seen,
            ResourceKey::Uniform(id),
            ResourceData::Uniform(id),
            uniform.active_stages,
        );
    }

    if let Some(linked) = &prog.stages[ShaderStage::Vertex.index()] {
        for &id in &linked.module.sets.inputs {
            let var = linked.module.var(id);

            let input = InputVariable {
                name: var.name.clone().unwrap_or_default(),
                ty: var.ty.clone(),
                location: var.location,
            };

            add_program_resource(
                &mut prog.resource_list,
                &mut seen,
                ResourceKey::Input(ShaderStage::Vertex, id),
                ResourceData::Input(input),
                ShaderStage::Vertex.bit(),
            );
        }
    }
}
