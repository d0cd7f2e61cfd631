//! # Drive Control Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use robot_lib::{
    drive_ctrl::{ChassisVelocity, DriveCmd, DriveCtrl, Params, SwerveKinematics},
    sim::{SimDriveIo, SimMechanism},
};

fn drive_ctrl_benchmark(c: &mut Criterion) {
    // ---- Build the controller against the simulator ----

    let params = Params::default();
    let geometry = params.validate().unwrap();
    let kinematics = SwerveKinematics::new(geometry);

    let mut drive =
        DriveCtrl::new(params, SimDriveIo::new(geometry), SimMechanism::default()).unwrap();

    // Worst case command, every slew path and the field relative transform
    let cmd = DriveCmd {
        speed: 1.0,
        forward: 0.7,
        sideways: -0.4,
        rotation: 0.3,
        field_relative: true,
        rate_limit: true,
        ..DriveCmd::default()
    };

    c.bench_function("SwerveKinematics::to_module_states", |b| {
        b.iter(|| kinematics.to_module_states(black_box(ChassisVelocity::new(2.0, -1.0, 1.5))))
    });

    c.bench_function("DriveCtrl::drive", |b| {
        b.iter(|| {
            drive.io_mut().step(0.02);
            drive.drive(black_box(cmd))
        })
    });

    c.bench_function("DriveCtrl::periodic", |b| {
        b.iter(|| {
            drive.io_mut().step(0.02);
            drive.periodic()
        })
    });
}

criterion_group!(benches, drive_ctrl_benchmark);
criterion_main!(benches);
