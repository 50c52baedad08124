//! The per-program link driver.
//!
//! Stages are processed strictly in pipeline order: unused-varying
//! elimination over each adjacent pair first, then uniform storage
//! allocation and remap tables, then the public resource list. The order is
//! semantically significant; it decides cross-stage dedup winners and the
//! numbering of implicit uniform locations.

use thiserror::Error;

use crate::{
    ir::ShaderStage,
    program::{LinkStatus, ShaderProgram},
    resources::build_program_resource_list,
    uniforms::link_uniforms,
    varyings::remove_unused_varyings,
};

#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("shader program failed to link:\n{log}")]
    Failed { log: String },
}

fn validate_stage_interfaces(prog: &mut ShaderProgram) {
    let mut errors = Vec::new();

    for linked in prog.stages.iter().flatten() {
        let sets = &linked.module.sets;
        for &id in sets.inputs.iter().chain(&sets.outputs) {
            let var = linked.module.var(id);
            if var.location < 0 {
                errors.push(format!(
                    "Input and output variables must be decorated with a Location \
                     ({:?} stage, variable {:?})",
                    linked.module.stage,
                    var.name.as_deref().unwrap_or("")
                ));
            }
        }
    }

    for error in errors {
        prog.linker_error(error);
    }
}

fn failed(prog: &ShaderProgram) -> Result<(), LinkError> {
    Err(LinkError::Failed {
        log: prog.info_log.clone(),
    })
}

/// Links `prog` in place. On failure the info log and failure status are left
/// on the program; partially built tables are not rolled back.
pub fn link_program(prog: &mut ShaderProgram) -> Result<(), LinkError> {
    // A re-link starts from a clean diagnostic slate; the tables themselves
    // are rebuilt by the passes below.
    prog.info_log.clear();
    prog.status = LinkStatus::None;

    validate_stage_interfaces(prog);
    if prog.status == LinkStatus::Failure {
        return failed(prog);
    }

    // Unused-varying elimination over every adjacent pair of present stages.
    // Compute takes no part in the varying interface.
    let present: Vec<usize> = (0..ShaderStage::Compute.index())
        .filter(|&idx| prog.stages[idx].is_some())
        .collect();

    for pair in present.windows(2) {
        let (left, right) = prog.stages.split_at_mut(pair[1]);
        if let (Some(producer), Some(consumer)) = (left[pair[0]].as_mut(), right[0].as_mut()) {
            remove_unused_varyings(&mut producer.module, &mut consumer.module);
        }
    }

    link_uniforms(prog);
    if prog.status == LinkStatus::Failure {
        return failed(prog);
    }

    build_program_resource_list(prog);

    prog.status = LinkStatus::Success;
    Ok(())
}
