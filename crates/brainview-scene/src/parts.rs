//! Part entities - point clouds and solids for every sub-mesh

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use brainview_core::{LoadedAsset, RegionTable, SubMesh, ViewMode};
use tracing::{debug, info, warn};

use crate::types::{
    to_color, to_color_alpha, BrainParts, CloudGeometry, PartCommand, PartPoints, PartSolid,
    SceneSettings, ViewState,
};

/// Plugin for part state and visibility
pub struct PartsPlugin;

impl Plugin for PartsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BrainParts>()
            .init_resource::<ViewState>()
            .add_message::<PartCommand>()
            .add_systems(
                Update,
                (apply_part_commands, sync_part_visibility).chain(),
            );
    }
}

/// Build the point-cloud mesh of a sub-mesh
pub fn point_mesh(sub_mesh: &SubMesh) -> Mesh {
    Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, sub_mesh.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, sub_mesh.normals.clone())
}

/// Build the solid mesh of a sub-mesh
pub fn solid_mesh(sub_mesh: &SubMesh) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, sub_mesh.positions.clone())
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, sub_mesh.normals.clone())
        .with_inserted_indices(Indices::U32(sub_mesh.indices.clone()))
}

/// Replace whatever is loaded with the parts of `asset`
///
/// Each sub-mesh is classified with `table` and spawned twice: a visible
/// point cloud and a hidden translucent solid.
pub fn spawn_asset(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    parts: &mut BrainParts,
    asset: &LoadedAsset,
    table: &RegionTable,
    settings: &SceneSettings,
) {
    for entity in parts.clear() {
        commands.entity(entity).despawn();
    }

    for sub_mesh in &asset.meshes {
        let classification = table.classify(&sub_mesh.name);
        let color = classification.color;

        let points = commands
            .spawn((
                Mesh3d(meshes.add(point_mesh(sub_mesh))),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: to_color(color),
                    unlit: true,
                    ..default()
                })),
                Transform::default(),
                Visibility::Inherited,
                Name::new(format!("{} points", sub_mesh.name)),
            ))
            .id();

        let solid = if sub_mesh.indices.is_empty() {
            // Nothing to fill; the solid is an empty placeholder
            commands
                .spawn((Transform::default(), Visibility::Hidden))
                .id()
        } else {
            commands
                .spawn((
                    Mesh3d(meshes.add(solid_mesh(sub_mesh))),
                    MeshMaterial3d(materials.add(StandardMaterial {
                        base_color: to_color_alpha(color, settings.0.solid_opacity),
                        alpha_mode: AlphaMode::Blend,
                        double_sided: true,
                        cull_mode: None,
                        ..default()
                    })),
                    Transform::default(),
                    Visibility::Hidden,
                    Name::new(format!("{} solid", sub_mesh.name)),
                ))
                .id()
        };

        let id = parts
            .registry
            .register(sub_mesh.name.clone(), classification, points, solid);
        commands.entity(points).insert(PartPoints(id));
        commands.entity(solid).insert(PartSolid(id));

        parts.clouds.push(CloudGeometry {
            positions: sub_mesh.positions.clone(),
            bounds: sub_mesh.bounds(),
        });
    }

    parts.bounds = asset.bounds();

    info!(
        source = %asset.source,
        parts = parts.registry.len(),
        groups = parts.registry.groups().len(),
        "Spawned brain parts"
    );
}

fn apply_part_commands(
    mut commands: MessageReader<PartCommand>,
    mut parts: ResMut<BrainParts>,
    mut view: ResMut<ViewState>,
) {
    for command in commands.read() {
        match command {
            PartCommand::Toggle(name) => {
                if view.mode != ViewMode::Menu {
                    debug!(group = %name, "Ignoring toggle outside menu mode");
                    continue;
                }
                if let Err(e) = parts.registry.toggle(name) {
                    warn!("Toggle failed: {}", e);
                } else {
                    debug!(group = %name, "Group shown solid");
                }
            }
            PartCommand::Reset => {
                parts.registry.reset();
                view.hovered_label = None;
            }
            PartCommand::SetMode(mode) => {
                if view.mode != *mode {
                    info!(mode = mode.label(), "View mode changed");
                    view.mode = *mode;
                }
                parts.registry.reset();
                view.hovered_label = None;
            }
        }
    }
}

/// Mirror registry visibility flags onto the part entities
fn sync_part_visibility(parts: Res<BrainParts>, mut visibility: Query<&mut Visibility>) {
    if !parts.is_changed() {
        return;
    }

    for part in parts.registry.parts() {
        for (entity, shown) in [
            (part.points, part.points_visible),
            (part.solid, part.solid_visible),
        ] {
            if let Ok(mut vis) = visibility.get_mut(entity) {
                let wanted = if shown {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
                vis.set_if_neq(wanted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;
    use bevy::mesh::VertexAttributeValues;
    use brainview_core::parse_obj;

    const OBJ: &str = "\
o Frontal1_a
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o Frontal1_b
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
o stem1
v 5 5 5
v 6 5 5
v 5 6 5
f 7 8 9
";

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(AssetPlugin::default())
            .init_asset::<Mesh>()
            .init_asset::<StandardMaterial>()
            .init_resource::<SceneSettings>()
            .add_plugins(PartsPlugin);
        app
    }

    fn spawn(app: &mut App) {
        let asset = parse_obj("test.obj", OBJ).unwrap();
        let table = RegionTable::default();
        app.world_mut()
            .run_system_once(
                move |mut commands: Commands,
                      mut meshes: ResMut<Assets<Mesh>>,
                      mut materials: ResMut<Assets<StandardMaterial>>,
                      mut parts: ResMut<BrainParts>,
                      settings: Res<SceneSettings>| {
                    spawn_asset(
                        &mut commands,
                        &mut meshes,
                        &mut materials,
                        &mut parts,
                        &asset,
                        &table,
                        &settings,
                    );
                },
            )
            .unwrap();
    }

    fn visibility(app: &App, entity: Entity) -> Visibility {
        *app.world().get::<Visibility>(entity).unwrap()
    }

    #[test]
    fn test_point_mesh_topology() {
        let asset = parse_obj("test.obj", OBJ).unwrap();
        let mesh = point_mesh(&asset.meshes[0]);
        assert_eq!(mesh.primitive_topology(), PrimitiveTopology::PointList);
        assert!(mesh.indices().is_none());
        match mesh.attribute(Mesh::ATTRIBUTE_POSITION) {
            Some(VertexAttributeValues::Float32x3(v)) => assert_eq!(v.len(), 3),
            other => panic!("unexpected positions {:?}", other),
        }

        let solid = solid_mesh(&asset.meshes[0]);
        assert_eq!(solid.primitive_topology(), PrimitiveTopology::TriangleList);
        assert_eq!(solid.indices().map(|i| i.len()), Some(3));
    }

    #[test]
    fn test_spawn_registers_groups() {
        let mut app = test_app();
        spawn(&mut app);

        let parts = app.world().resource::<BrainParts>();
        assert_eq!(parts.registry.len(), 3);
        assert_eq!(parts.clouds.len(), 3);
        let groups: Vec<_> = parts.registry.group_names().collect();
        assert_eq!(groups, vec!["Frontal Lobe", "Brainstem"]);

        let first = &parts.registry.parts()[0];
        assert_eq!(visibility(&app, first.points), Visibility::Inherited);
        assert_eq!(visibility(&app, first.solid), Visibility::Hidden);
    }

    #[test]
    fn test_toggle_syncs_visibility() {
        let mut app = test_app();
        spawn(&mut app);

        app.world_mut()
            .write_message(PartCommand::Toggle("Frontal Lobe".into()));
        app.update();

        let parts = app.world().resource::<BrainParts>();
        for part in parts.registry.parts() {
            let selected = part.display_name == "Frontal Lobe";
            let (points, solid) = if selected {
                (Visibility::Hidden, Visibility::Inherited)
            } else {
                (Visibility::Inherited, Visibility::Hidden)
            };
            assert_eq!(visibility(&app, part.points), points);
            assert_eq!(visibility(&app, part.solid), solid);
        }
    }

    #[test]
    fn test_unknown_toggle_keeps_state() {
        let mut app = test_app();
        spawn(&mut app);

        app.world_mut().write_message(PartCommand::Toggle("Brainstem".into()));
        app.update();
        app.world_mut().write_message(PartCommand::Toggle("Amygdala".into()));
        app.update();

        let parts = app.world().resource::<BrainParts>();
        assert_eq!(parts.registry.selected_group(), Some("Brainstem"));
        assert_eq!(parts.registry.visible_solid_count(), 1);
    }

    #[test]
    fn test_mode_switch_resets() {
        let mut app = test_app();
        spawn(&mut app);

        app.world_mut()
            .write_message(PartCommand::Toggle("Frontal Lobe".into()));
        app.update();
        app.world_mut()
            .write_message(PartCommand::SetMode(ViewMode::Hover));
        app.update();

        assert_eq!(app.world().resource::<ViewState>().mode, ViewMode::Hover);
        let parts = app.world().resource::<BrainParts>();
        assert_eq!(parts.registry.visible_solid_count(), 0);
        assert!(parts.registry.parts().iter().all(|p| p.points_visible));

        // Toggles are menu-only
        app.world_mut().write_message(PartCommand::Toggle("Brainstem".into()));
        app.update();
        let parts = app.world().resource::<BrainParts>();
        assert_eq!(parts.registry.visible_solid_count(), 0);
    }

    #[test]
    fn test_respawn_replaces_parts() {
        let mut app = test_app();
        spawn(&mut app);
        let old = app.world().resource::<BrainParts>().registry.parts()[0].points;

        spawn(&mut app);
        assert!(app.world().get_entity(old).is_err());
        assert_eq!(app.world().resource::<BrainParts>().registry.len(), 3);
    }
}
