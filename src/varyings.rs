//! Slot-mask construction and unused-varying elimination over adjacent stage
//! pairs.

use crate::ir::{
    Instruction, ShaderStage, StageModule, Type, VarMode, Variable, FIRST_GENERIC_SLOT,
    PATCH_SLOT_BASE,
};

/// Returns the interface-slot bits occupied by `var`, relative to its slot
/// space (patch varyings are rebased against [`PATCH_SLOT_BASE`]). Unassigned
/// locations contribute no bits. Must only be called on interface variables.
pub fn variable_slot_mask(module: &StageModule, var: &Variable) -> u64 {
    if var.location < 0 {
        return 0;
    }

    debug_assert!(matches!(
        var.mode,
        VarMode::Input | VarMode::Output | VarMode::SystemValue
    ));

    let location = if var.patch {
        var.location as u32 - PATCH_SLOT_BASE
    } else {
        var.location as u32
    };

    let mut ty = &var.ty;
    if module.is_per_vertex_io(var) {
        let Type::Array { element, .. } = ty else {
            unreachable!("per-vertex IO variables are always arrayed");
        };
        ty = element;
    }

    let slots = ty.attribute_slots();
    ((1u64 << slots) - 1) << location
}

// === Slot usage masks === //

/// Read or write masks for one side of a stage interface, split by patchness
/// and indexed by sub-slot component.
#[derive(Debug, Default)]
struct SlotUsage {
    per_vertex: [u64; 4],
    patch: [u64; 4],
}

impl SlotUsage {
    fn add(&mut self, module: &StageModule, var: &Variable) {
        let masks = if var.patch {
            &mut self.patch
        } else {
            &mut self.per_vertex
        };
        masks[var.location_frac as usize] |= variable_slot_mask(module, var);
    }

    fn opposing(&self, var: &Variable) -> u64 {
        let masks = if var.patch {
            &self.patch
        } else {
            &self.per_vertex
        };
        masks[var.location_frac as usize]
    }
}

/// Each tessellation-control invocation can read outputs written by its
/// sibling invocations, so an output read anywhere in the stage must survive
/// even if the next stage never reads it.
fn tess_ctrl_output_reads(module: &StageModule, read: &mut SlotUsage) {
    for instr in &module.instructions {
        let Instruction::Load(id) = *instr else {
            continue;
        };

        let var = module.var(id);
        if var.mode == VarMode::Output {
            read.add(module, var);
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum IoSide {
    Inputs,
    Outputs,
}

fn remove_unused_io_vars(module: &mut StageModule, side: IoSide, used: &SlotUsage) -> bool {
    let mut progress = false;

    let candidates = match side {
        IoSide::Inputs => module.sets.inputs.clone(),
        IoSide::Outputs => module.sets.outputs.clone(),
    };

    for id in candidates {
        let var = module.var(id);

        // Built-ins below the generic range are never eliminated.
        if var.location >= 0 && (var.location as u32) < FIRST_GENERIC_SLOT {
            continue;
        }

        if var.always_active_io {
            continue;
        }

        if used.opposing(var) & variable_slot_mask(module, var) == 0 {
            log::debug!(
                "demoting unused {:?}-stage varying {:?} at location {}",
                module.stage,
                var.name,
                var.location
            );
            module.demote_to_global(id);
            progress = true;
        }
    }

    progress
}

/// Demotes producer outputs the consumer never reads and consumer inputs the
/// producer never writes. Returns whether anything was demoted.
pub fn remove_unused_varyings(producer: &mut StageModule, consumer: &mut StageModule) -> bool {
    assert!(producer.stage != ShaderStage::Fragment);
    assert!(consumer.stage != ShaderStage::Vertex);

    let mut read = SlotUsage::default();
    let mut written = SlotUsage::default();

    for &id in &producer.sets.outputs {
        written.add(producer, producer.var(id));
    }

    for &id in &consumer.sets.inputs {
        read.add(consumer, consumer.var(id));
    }

    if producer.stage == ShaderStage::TessCtrl {
        tess_ctrl_output_reads(producer, &mut read);
    }

    let mut progress = remove_unused_io_vars(producer, IoSide::Outputs, &read);
    progress |= remove_unused_io_vars(consumer, IoSide::Inputs, &written);
    progress
}
