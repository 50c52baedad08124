//! End-to-end link scenarios across a two-stage pipeline.

use stage_link::{
    ir::{
        ShaderStage, StageModule, TextureDim, Type, VarMode, Variable, FIRST_GENERIC_SLOT,
    },
    link_program,
    program::{LinkStatus, ShaderProgram},
    resources::{ResourceData, ResourceKind},
    LinkError,
};

fn vec4_var(name: &str, mode: VarMode, location: i32) -> Variable {
    Variable::new(name, Type::vec4(), mode, location)
}

#[test]
fn two_stage_link_demotes_the_unread_varying_only() {
    let read_loc = (FIRST_GENERIC_SLOT + 10) as i32;
    let unread_loc = (FIRST_GENERIC_SLOT + 11) as i32;

    let mut vs = StageModule::new(ShaderStage::Vertex);
    vs.declare(vec4_var("position", VarMode::Input, 0));
    let vs_read = vs.declare(vec4_var("v_color", VarMode::Output, read_loc));
    let vs_unread = vs.declare(vec4_var("v_unused", VarMode::Output, unread_loc));

    let mut fs = StageModule::new(ShaderStage::Fragment);
    let fs_in = fs.declare(vec4_var("v_color", VarMode::Input, read_loc));

    let mut prog = ShaderProgram::new();
    prog.attach(vs);
    prog.attach(fs);

    link_program(&mut prog).unwrap();
    assert_eq!(prog.status, LinkStatus::Success);

    let vs = prog.stage(ShaderStage::Vertex).unwrap();
    let fs = prog.stage(ShaderStage::Fragment).unwrap();

    // The matched varying is untouched on both sides.
    assert_eq!(vs.module.var(vs_read).mode, VarMode::Output);
    assert_eq!(vs.module.var(vs_read).location, read_loc);
    assert_eq!(fs.module.var(fs_in).mode, VarMode::Input);
    assert_eq!(fs.module.var(fs_in).location, read_loc);

    // The unread one left the interface.
    assert_eq!(vs.module.var(vs_unread).mode, VarMode::Global);
    assert_eq!(vs.module.var(vs_unread).location, 0);
    assert!(vs.module.sets.globals.contains(&vs_unread));
    assert!(!vs.module.sets.outputs.contains(&vs_unread));
}

#[test]
fn full_pipeline_produces_uniform_and_input_resources() {
    let varying_loc = (FIRST_GENERIC_SLOT + 1) as i32;

    let mut vs = StageModule::new(ShaderStage::Vertex);
    vs.declare(vec4_var("position", VarMode::Input, 0));
    vs.declare(vec4_var("v_uv", VarMode::Output, varying_loc));
    vs.declare(Variable::new(
        "mvp",
        Type::Matrix { columns: 4, rows: 4 },
        VarMode::Uniform,
        0,
    ));

    let mut fs = StageModule::new(ShaderStage::Fragment);
    fs.declare(vec4_var("v_uv", VarMode::Input, varying_loc));
    fs.declare(Variable::new(
        "albedo",
        Type::Sampler {
            dim: TextureDim::D2,
            shadow: false,
        },
        VarMode::Uniform,
        4,
    ));
    // Shared with the vertex stage by explicit location.
    fs.declare(Variable::new(
        "mvp",
        Type::Matrix { columns: 4, rows: 4 },
        VarMode::Uniform,
        0,
    ));

    let mut prog = ShaderProgram::new();
    prog.attach(vs);
    prog.attach(fs);

    link_program(&mut prog).unwrap();

    // Two uniform entries, merged across stages, plus one vertex input.
    let uniforms: Vec<_> = prog
        .resource_list
        .iter()
        .filter(|r| r.kind == ResourceKind::Uniform)
        .collect();
    let inputs: Vec<_> = prog
        .resource_list
        .iter()
        .filter(|r| r.kind == ResourceKind::ProgramInput)
        .collect();
    assert_eq!(uniforms.len(), 2);
    assert_eq!(inputs.len(), 1);

    let mvp = prog.uniform_at_location(0).unwrap();
    assert_eq!(mvp.name, "mvp");
    assert!(mvp.active_stages.contains(ShaderStage::Vertex));
    assert!(mvp.active_stages.contains(ShaderStage::Fragment));

    let albedo = prog.uniform_at_location(4).unwrap();
    assert_eq!(albedo.name, "albedo");
    assert!(albedo.active_stages.contains(ShaderStage::Fragment));
    assert!(!albedo.active_stages.contains(ShaderStage::Vertex));

    let ResourceData::Input(input) = &inputs[0].data else {
        panic!("expected an input descriptor");
    };
    assert_eq!(input.name, "position");

    let fs = prog.stage(ShaderStage::Fragment).unwrap();
    assert_eq!(fs.program.num_textures, 1);
    assert_eq!(fs.program.sampler_targets[0], Some(TextureDim::D2));
}

#[test]
fn interface_variable_without_location_fails_the_link() {
    let mut vs = StageModule::new(ShaderStage::Vertex);
    vs.declare(vec4_var("position", VarMode::Input, 0));
    vs.declare(vec4_var("undecorated", VarMode::Output, -1));

    let mut fs = StageModule::new(ShaderStage::Fragment);
    fs.declare(vec4_var("undecorated", VarMode::Input, -1));

    let mut prog = ShaderProgram::new();
    prog.attach(vs);
    prog.attach(fs);

    let err = link_program(&mut prog).unwrap_err();
    assert_eq!(prog.status, LinkStatus::Failure);

    let LinkError::Failed { log } = err;
    assert!(log.contains("decorated with a Location"));
}

#[test]
fn relinking_rebuilds_every_table() {
    let mut vs = StageModule::new(ShaderStage::Vertex);
    vs.declare(vec4_var("position", VarMode::Input, 0));
    vs.declare(Variable::new("tint", Type::vec4(), VarMode::Uniform, 2));

    let mut prog = ShaderProgram::new();
    prog.attach(vs);

    link_program(&mut prog).unwrap();
    let first_resources = prog.resource_list.len();
    let first_remap = prog.remap_table.len();

    link_program(&mut prog).unwrap();
    assert_eq!(prog.resource_list.len(), first_resources);
    assert_eq!(prog.remap_table.len(), first_remap);
    assert_eq!(prog.uniform_storage.len(), 1);
}
