use glam::Quat;

use crate::host::report;
use crate::math::{compose, euler_to_quat};
use crate::{
    ConstraintKind, ConstraintOptions, IkHandle, NodeId, SceneHost, Skeleton, SkeletonInstance,
    SkipAxes, Transform,
};

pub const DEFAULT_IK_HANDLE_NAME: &str = "CastIKHandle";

/// Creates every IK handle of `skeleton` on the joints built for it.
pub fn import_ik_handles(
    host: &mut dyn SceneHost,
    skeleton: &Skeleton<'_>,
    instance: &SkeletonInstance,
) {
    for handle in skeleton.ik_handles() {
        import_ik_handle(host, &handle, instance);
    }
}

fn resolve(instance: &SkeletonInstance, hash: Option<u64>) -> Option<usize> {
    hash.and_then(|h| instance.index_of(h))
}

fn import_ik_handle(host: &mut dyn SceneHost, handle: &IkHandle<'_>, instance: &SkeletonInstance) {
    let name = handle.name().unwrap_or(DEFAULT_IK_HANDLE_NAME);
    let (Some(start), Some(end)) = (
        resolve(instance, handle.start_bone()),
        resolve(instance, handle.end_bone()),
    ) else {
        report(host, format!("IK handle {name} references missing bones, skipping"));
        return;
    };

    bake_chain_rotation(host, instance, start, end);

    let node = match host.create_ik_handle(name, instance.handles[start], instance.handles[end]) {
        Ok(node) => node,
        Err(e) => {
            report(host, format!("Unable to create IK handle {name}: {e}"));
            return;
        }
    };

    let parent = match resolve(instance, handle.target_bone()) {
        Some(target) => {
            let target = instance.handles[target];
            if handle.use_target_rotation() {
                let options = ConstraintOptions {
                    name: ConstraintKind::Orient.default_name().to_string(),
                    maintain_offset: false,
                    skip: SkipAxes::default(),
                };
                if let Err(e) = host.create_constraint(
                    ConstraintKind::Orient,
                    target,
                    instance.handles[end],
                    &options,
                ) {
                    report(host, format!("Unable to constrain IK handle {name} rotation: {e}"));
                }
            }
            target
        }
        None => instance.group,
    };
    if let Err(e) = host.set_parent(node, Some(parent)) {
        report(host, format!("Unable to parent IK handle {name}: {e}"));
    }

    if let Some(pole_vector) = resolve(instance, handle.pole_vector_bone()) {
        if let Err(e) = host.connect_pole_vector(node, instance.handles[pole_vector]) {
            report(host, format!("Unable to connect pole vector of {name}: {e}"));
        }
    }
    if let Some(pole) = resolve(instance, handle.pole_bone()) {
        if let Err(e) = host.connect_twist(node, instance.handles[pole]) {
            report(host, format!("Unable to connect twist of {name}: {e}"));
        }
    }

    let reset = host
        .transform(node)
        .map(|t| Transform {
            scale: t.scale,
            ..Transform::IDENTITY
        })
        .and_then(|t| host.set_transform(node, t));
    if let Err(e) = reset {
        report(host, format!("Unable to reset IK handle {name}: {e}"));
    }
}

/// Moves each chain joint's rotation into its joint orient, walking from `end` towards `start`.
///
/// The solver owns the rotate channel once the handle exists. A chain that never reaches
/// `start` stops at the top of the hierarchy.
fn bake_chain_rotation(
    host: &mut dyn SceneHost,
    instance: &SkeletonInstance,
    start: usize,
    end: usize,
) {
    let mut current = end;
    for _ in 0..=instance.len() {
        bake_joint_rotation(host, instance.handles[current]);
        if current == start {
            return;
        }
        match instance.parents.get(current).copied().flatten() {
            Some(parent) => current = parent,
            None => return,
        }
    }
}

fn bake_joint_rotation(host: &mut dyn SceneHost, joint: NodeId) {
    let result = host.transform(joint).and_then(|mut transform| {
        let orient = host.joint_orient(joint).unwrap_or(Quat::IDENTITY);
        let rotation = euler_to_quat(transform.rotate);
        host.set_joint_orient(joint, compose(rotation, orient))?;
        transform.rotate = glam::Vec3::ZERO;
        host.set_transform(joint, transform)
    });
    if let Err(e) = result {
        report(host, format!("Unable to prepare IK joint: {e}"));
    }
}

pub fn import_constraints(
    host: &mut dyn SceneHost,
    skeleton: &Skeleton<'_>,
    instance: &SkeletonInstance,
) {
    for constraint in skeleton.constraints() {
        let code = constraint.constraint_type().unwrap_or_default();
        let Some(kind) = ConstraintKind::from_code(code) else {
            report(host, format!("Unknown constraint type '{code}', skipping"));
            continue;
        };
        let (Some(target), Some(constrained)) = (
            resolve(instance, constraint.target_bone()),
            resolve(instance, constraint.constraint_bone()),
        ) else {
            report(host, "Constraint references missing bones, skipping".to_string());
            continue;
        };

        let options = ConstraintOptions {
            name: constraint
                .name()
                .unwrap_or(kind.default_name())
                .to_string(),
            maintain_offset: constraint.maintain_offset(),
            skip: SkipAxes {
                x: constraint.skip_x(),
                y: constraint.skip_y(),
                z: constraint.skip_z(),
            },
        };
        if let Err(e) = host.create_constraint(
            kind,
            instance.handles[target],
            instance.handles[constrained],
            &options,
        ) {
            report(host, format!("Unable to create constraint {}: {e}", options.name));
        }
    }
}
