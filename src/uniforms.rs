//! Uniform storage allocation and remap-table construction.
//!
//! [`link_uniforms`] walks every linked stage in pipeline order, creating or
//! merging one [`UniformStorage`] entry per leaf uniform value, then builds
//! the flat location -> entry remap table. Struct uniforms are flattened
//! recursively into dotted names; samplers and images draw flat indices from
//! program-wide counters.

use crate::{
    ir::{ShaderStage, StageProgram, Type, MAX_IMAGE_UNIFORMS, MAX_SAMPLERS, STAGE_COUNT},
    program::{OpaqueBinding, ShaderProgram, UniformId, UniformStorage},
};

/// Running allocator state, passed explicitly to every recursive call.
#[derive(Debug, Default)]
struct LinkUniformsState {
    // Program-wide.
    num_values: u32,
    max_uniform_location: u32,
    shader_samplers_used: u32,
    shader_shadow_samplers: u32,
    next_sampler_index: u32,
    next_image_index: u32,

    // Per stage, reset when a new stage begins.
    num_shader_samplers: u32,
    num_shader_images: u32,
    num_shader_uniform_components: u32,
}

/// Linear scan for an entry already claiming this explicit location. Uniform
/// counts are small; first-declared wins.
fn find_previous_uniform_storage(prog: &ShaderProgram, location: u32) -> Option<UniformId> {
    prog.uniform_storage
        .enumerate()
        .find(|(_, uniform)| uniform.remap_location == Some(location))
        .map(|(id, _)| id)
}

/// Stage-mask merge for uniforms without an explicit location, keyed by full
/// name (struct members match through their dotted prefix).
fn merge_previous_uniform_by_name(prog: &mut ShaderProgram, name: &str, stage: ShaderStage) -> bool {
    let mut merged = false;

    for uniform in prog.uniform_storage.iter_mut() {
        if uniform.remap_location.is_some() {
            continue;
        }

        let matches = uniform.name == name
            || uniform
                .name
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('.'));

        if matches {
            uniform.active_stages |= stage.bit();
            merged = true;
        }
    }

    merged
}

fn link_uniform(
    prog: &mut ShaderProgram,
    stage_program: &mut StageProgram,
    stage: ShaderStage,
    ty: &Type,
    name: Option<&str>,
    location: i32,
    state: &mut LinkUniformsState,
) {
    if let Type::Struct { fields } = ty {
        let mut location = location;

        for field in fields {
            let field_name = match name {
                Some(parent) => format!("{parent}.{}", field.name),
                None => field.name.clone(),
            };

            link_uniform(
                prog,
                stage_program,
                stage,
                &field.ty,
                Some(&field_name),
                location,
                state,
            );

            if location >= 0 {
                location += field.ty.length().max(1) as i32;
            }
        }

        return;
    }

    let type_no_array = ty.without_array();
    let array_elements = if ty.is_array() { ty.length() } else { 0 };
    let entries = array_elements.max(1);
    let remap_location = (location >= 0).then_some(location as u32);

    let mut uniform = UniformStorage {
        name: name.unwrap_or("").to_owned(),
        ty: type_no_array.clone(),
        array_elements,
        remap_location,
        active_stages: stage.bit(),
        opaque: [OpaqueBinding::default(); STAGE_COUNT],
        storage_offset: 0,
        builtin: false,
        is_shader_storage: false,
    };

    match *type_no_array {
        Type::Sampler { dim, shadow } => {
            let sampler_index = state.next_sampler_index;
            state.next_sampler_index += entries;
            state.num_shader_samplers += 1;

            uniform.opaque[stage.index()] = OpaqueBinding {
                active: true,
                index: sampler_index,
            };

            // Indices past the hardware cap are silently not recorded in the
            // per-stage target table.
            if state.next_sampler_index > MAX_SAMPLERS {
                log::warn!(
                    "sampler {:?} overflows the {MAX_SAMPLERS}-unit target table",
                    uniform.name
                );
            }

            for i in sampler_index..state.next_sampler_index.min(MAX_SAMPLERS) {
                stage_program.sampler_targets[i as usize] = Some(dim);
                state.shader_samplers_used |= 1 << i;
                state.shader_shadow_samplers |= u32::from(shadow) << i;
            }
        }
        Type::Image { access, .. } => {
            let image_index = state.next_image_index;
            state.next_image_index += entries;
            state.num_shader_images += 1;

            uniform.opaque[stage.index()] = OpaqueBinding {
                active: true,
                index: image_index,
            };

            if state.next_image_index > MAX_IMAGE_UNIFORMS {
                log::warn!(
                    "image {:?} overflows the {MAX_IMAGE_UNIFORMS}-unit access table",
                    uniform.name
                );
            }

            for i in image_index..state.next_image_index.min(MAX_IMAGE_UNIFORMS) {
                stage_program.image_access[i as usize] = Some(access);
            }
        }
        _ => {}
    }

    let values = ty.component_slots();
    state.num_shader_uniform_components += values;
    state.num_values += values;

    if let Some(base) = remap_location {
        state.max_uniform_location = state.max_uniform_location.max(base + entries);
    }

    prog.uniform_storage.push(uniform);
}

/// Allocates uniform storage for every linked stage in pipeline order, then
/// builds the remap table. Previous tables are discarded first.
pub fn link_uniforms(prog: &mut ShaderProgram) {
    prog.uniform_storage = Default::default();
    prog.remap_table.clear();

    let mut state = LinkUniformsState::default();

    for stage in ShaderStage::ALL {
        let Some(mut linked) = prog.stages[stage.index()].take() else {
            continue;
        };

        state.num_shader_samplers = 0;
        state.num_shader_images = 0;
        state.num_shader_uniform_components = 0;

        let uniforms = linked.module.sets.uniforms.clone();

        // Explicit locations first; their entries win cross-stage merges.
        for &id in &uniforms {
            let var = linked.module.var(id);
            if var.location < 0 {
                continue;
            }

            if let Some(prev) = find_previous_uniform_storage(prog, var.location as u32) {
                // Cross-stage compatibility is assumed here, not re-validated.
                prog.uniform_storage[prev].active_stages |= stage.bit();
                continue;
            }

            link_uniform(
                prog,
                &mut linked.program,
                stage,
                &var.ty,
                var.name.as_deref(),
                var.location,
                &mut state,
            );
        }

        // Uniforms without an explicit location are deferred: they become
        // unmapped entries the remap builder numbers after the explicit ones,
        // deduplicated across stages by name.
        for &id in &uniforms {
            let var = linked.module.var(id);
            if var.location >= 0 {
                continue;
            }

            let Some(name) = var.name.clone() else {
                prog.stages[stage.index()] = Some(linked);
                prog.linker_error("Default-block uniforms without Name must have a Location");
                return;
            };

            if merge_previous_uniform_by_name(prog, &name, stage) {
                continue;
            }

            log::debug!("uniform {name:?} has no explicit location; assigning a trailing one");

            link_uniform(
                prog,
                &mut linked.program,
                stage,
                &var.ty,
                Some(&name),
                -1,
                &mut state,
            );
        }

        linked.program.samplers_used = state.shader_samplers_used;
        linked.program.shadow_samplers = state.shader_shadow_samplers;
        linked.program.num_textures = state.num_shader_samplers;
        linked.program.num_images = state.num_shader_images;
        linked.program.num_uniform_components = state.num_shader_uniform_components;

        prog.stages[stage.index()] = Some(linked);
    }

    prog.num_uniform_data_slots = state.num_values;

    setup_uniform_remap_tables(prog, &state);
}

/// Two passes over the storage entries: reserve every explicit location's
/// slot range, then append the unmapped entries in storage order. That order
/// defines the public numbering of implicit locations and is a contract.
fn setup_uniform_remap_tables(prog: &mut ShaderProgram, state: &LinkUniformsState) {
    prog.remap_table = vec![None; state.max_uniform_location as usize];

    let mut data_pos = 0;

    // Reserve all the explicit locations of the active uniforms.
    let ids: Vec<UniformId> = prog.uniform_storage.keys().collect();
    for &id in &ids {
        let Some(base) = prog.uniform_storage[id].remap_location else {
            continue;
        };

        let entries = prog.uniform_storage[id].entries();
        let num_slots = prog.uniform_storage[id].ty.component_slots();

        prog.uniform_storage[id].storage_offset = data_pos;

        for element in 0..entries {
            prog.remap_table[(base + element) as usize] = Some(id);
            data_pos += num_slots;
        }
    }

    // Append locations for the rest of the uniforms.
    for &id in &ids {
        let uniform = &prog.uniform_storage[id];

        if uniform.is_shader_storage || uniform.builtin || uniform.remap_location.is_some() {
            continue;
        }

        let entries = uniform.entries();
        let num_slots = uniform.ty.component_slots();
        let chosen_location = prog.remap_table.len() as u32;

        prog.remap_table
            .extend(std::iter::repeat(Some(id)).take(entries as usize));

        prog.uniform_storage[id].remap_location = Some(chosen_location);
        prog.uniform_storage[id].storage_offset = data_pos;
        data_pos += entries * num_slots;
    }
}
