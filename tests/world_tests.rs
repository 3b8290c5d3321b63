use fixbody::primitives::{aabox_inside, ground};
use fixbody::{
    ApproxLength, Body, BodyFlags, Config, Connection, Joint, NoOpStepObserver, StepObserver, Template, Unit, Vec3,
    World, F,
};

fn floor(p: Vec3, _: Unit) -> Vec3 {
    ground(p, 0)
}

fn far_floor(p: Vec3, _: Unit) -> Vec3 {
    ground(p, -100 * F)
}

const BALL: Template = Template::Ball { joint_size: F / 2 };
const MARGIN: Unit = F / 64;

#[derive(Default)]
struct Recorder {
    integrated: Vec<usize>,
    collisions: Vec<(usize, usize)>,
    deactivated: Vec<usize>,
    steps: usize,
}

impl StepObserver for Recorder {
    fn on_integrate(&mut self, body: usize) {
        self.integrated.push(body);
    }

    fn on_body_collision(&mut self, body1: usize, body2: usize) {
        self.collisions.push((body1, body2));
    }

    fn on_deactivate(&mut self, body: usize) {
        self.deactivated.push(body);
    }

    fn on_step_complete(&mut self) {
        self.steps += 1;
    }
}

#[test]
fn ball_comes_to_rest_on_ground() {
    let mut joints = [Joint::default(); 1];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, floor);

    let ball = world.add_body(&BALL, F).unwrap();
    world.body_mut(ball).unwrap().move_to(Vec3::new(0, 4 * F, 0));
    world.body_mut(ball).unwrap().accelerate(Vec3::new(0, -30, 0));

    let mut slept = None;

    for tick in 0..1000 {
        world.body_mut(ball).unwrap().apply_gravity(5);
        world.step(&mut NoOpStepObserver);

        let body = world.body(ball).unwrap();
        assert!(body.joints[0].position.y >= F / 2 - MARGIN, "tick {}: {:?}", tick, body.joints[0]);

        if !body.is_active() {
            slept = Some(tick);
            break;
        }
    }

    assert!(slept.is_some(), "ball never fell asleep");
    assert_eq!(world.body(ball).unwrap().joints[0].velocity, [0; 3]);
}

#[test]
fn ball_rests_with_approximate_lengths() {
    let mut joints = [Joint::default(); 1];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, floor).with_metric::<ApproxLength>();

    let ball = world.add_body(&BALL, F).unwrap();
    world.body_mut(ball).unwrap().move_to(Vec3::new(F, 3 * F, -F));

    for _ in 0..400 {
        world.body_mut(ball).unwrap().apply_gravity(5);
        world.step(&mut NoOpStepObserver);
        assert!(world.body(ball).unwrap().joints[0].position.y >= F / 2 - MARGIN);
    }
}

#[test]
fn deactivation_happens_on_exact_tick() {
    let mut joints = [Joint::default(); 1];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    let ball = world.add_body(&BALL, F).unwrap();
    world.body_mut(ball).unwrap().accelerate(Vec3::new(0, 0, 10));

    let after = world.config().deactivate_after as usize;
    let mut recorder = Recorder::default();

    for _ in 0..after {
        world.step(&mut recorder);
    }

    assert!(world.body(ball).unwrap().is_active());
    assert_eq!(world.body(ball).unwrap().joints[0].velocity, [0, 0, 10]);

    world.step(&mut recorder);

    let body = world.body(ball).unwrap();
    assert!(!body.is_active());
    assert_eq!(body.joints[0].velocity, [0; 3]);
    assert_eq!(body.props.deactivate_count, 0);
    assert_eq!(recorder.deactivated, vec![ball]);
    assert_eq!(recorder.steps, after + 1);
}

#[test]
fn fast_body_never_counts_toward_sleep() {
    let mut joints = [Joint::default(); 1];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    let ball = world.add_body(&BALL, F).unwrap();
    world.body_mut(ball).unwrap().accelerate(Vec3::new(100, 0, 0));

    for _ in 0..300 {
        world.step(&mut NoOpStepObserver);
    }

    let body = world.body(ball).unwrap();
    assert!(body.is_active());
    assert_eq!(body.props.deactivate_count, 0);
}

#[test]
fn always_active_body_never_sleeps() {
    let mut joints = [Joint::default(); 1];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    let ball = world.add_body(&BALL, F).unwrap();
    world.body_mut(ball).unwrap().props.flags.insert(BodyFlags::ALWAYS_ACTIVE);

    let mut recorder = Recorder::default();

    for _ in 0..1000 {
        world.step(&mut recorder);
    }

    assert!(world.body(ball).unwrap().is_active());
    assert!(recorder.deactivated.is_empty());
    assert_eq!(recorder.integrated.len(), 1000);
}

#[test]
fn shorter_deactivation_from_config() {
    let mut joints = [Joint::default(); 1];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor)
        .with_config(Config::new().with_deactivate_after(10));

    let ball = world.add_body(&BALL, F).unwrap();

    for _ in 0..10 {
        world.step(&mut NoOpStepObserver);
    }
    assert!(world.body(ball).unwrap().is_active());

    world.step(&mut NoOpStepObserver);
    assert!(!world.body(ball).unwrap().is_active());
}

#[test]
fn nonrotating_box_lands_without_deforming() {
    let mut joints = [Joint::default(); 8];
    let mut connections = [Connection::default(); 16];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, floor);

    let cube = world
        .add_body(&Template::Box { width: F, depth: F, height: F, joint_size: F / 4 }, F)
        .unwrap();

    {
        let mut body = world.body_mut(cube).unwrap();
        body.props.flags.insert(BodyFlags::NONROTATING);
        body.move_to(Vec3::new(0, 2 * F, 0));
    }

    let before = {
        let body = world.body(cube).unwrap();
        let origin = body.joints[0].position;
        body.joints.iter().map(|j| j.position - origin).collect::<Vec<_>>()
    };

    for _ in 0..200 {
        world.body_mut(cube).unwrap().apply_gravity(6);
        world.step(&mut NoOpStepObserver);

        let body = world.body(cube).unwrap();
        let origin = body.joints[0].position;
        let now: Vec<_> = body.joints.iter().map(|j| j.position - origin).collect();

        assert_eq!(now, before);
        assert!(body.joints.iter().all(|j| j.position.y >= j.size() - MARGIN));
    }
}

#[test]
fn rigid_box_keeps_its_shape_on_ground() {
    let mut joints = [Joint::default(); 8];
    let mut connections = [Connection::default(); 16];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, floor);

    let cube = world
        .add_body(&Template::Box { width: 2 * F, depth: 2 * F, height: 2 * F, joint_size: F / 2 }, 2 * F)
        .unwrap();

    world.body_mut(cube).unwrap().move_to(Vec3::new(0, 3 * F, 0));

    for _ in 0..300 {
        world.body_mut(cube).unwrap().apply_gravity(5);
        world.step(&mut NoOpStepObserver);
    }

    let body = world.body(cube).unwrap();

    for c in body.connections {
        let d = body.joints[c.joint1 as usize].position.distance(body.joints[c.joint2 as usize].position);
        let err = (d - c.length as Unit).abs();

        assert!(err * 10 <= c.length as Unit, "connection {:?} is {} long", c, d);
    }

    assert!(body.joints.iter().all(|j| j.position.y >= j.size() - MARGIN));
}

#[test]
fn soft_body_is_not_reshaped() {
    let mut joints = [Joint::default(); 2];
    let mut connections = [Connection::default(); 1];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    let stick = world.add_body(&Template::Stick { length: 2 * F, joint_size: F / 4 }, F).unwrap();
    {
        let mut body = world.body_mut(stick).unwrap();
        body.props.flags.insert(BodyFlags::SOFT | BodyFlags::SIMPLE_CONN);
        body.joints[0].position.x += F;
    }

    world.step(&mut NoOpStepObserver);

    let body = world.body(stick).unwrap();
    assert_eq!(body.joints[0].position.distance(body.joints[1].position), 3 * F);
}

#[test]
fn stretched_rigid_stick_snaps_back() {
    let mut joints = [Joint::default(); 2];
    let mut connections = [Connection::default(); 1];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    let stick = world.add_body(&Template::Stick { length: 2 * F, joint_size: F / 4 }, F).unwrap();
    world.body_mut(stick).unwrap().joints[0].position.x += F;

    world.step(&mut NoOpStepObserver);

    let body = world.body(stick).unwrap();
    let d = body.joints[0].position.distance(body.joints[1].position);
    assert!((d - 2 * F).abs() <= 4, "{}", d);
}

#[test]
fn body_pairs_are_visited_in_index_order() {
    let mut joints = [Joint::default(); 3];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 3];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    for x in [0, 400, 800] {
        let i = world.add_body(&BALL, F).unwrap();
        world.body_mut(i).unwrap().move_to(Vec3::new(x, 0, 0));
    }

    let mut recorder = Recorder::default();
    world.step(&mut recorder);

    assert_eq!(recorder.collisions, vec![(0, 1), (1, 2)]);
    assert_eq!(recorder.integrated, vec![0, 1, 2]);
}

#[test]
fn sleeping_body_is_hit_by_later_body() {
    let mut joints = [Joint::default(); 2];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 2];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    let sleeper = world.add_body(&BALL, F).unwrap();
    let mover = world.add_body(&BALL, F).unwrap();

    world.body_mut(mover).unwrap().move_to(Vec3::new(F + 20, 0, 0));
    world.body_mut(mover).unwrap().accelerate(Vec3::new(-30, 0, 0));
    world.body_mut(sleeper).unwrap().deactivate();

    let mut recorder = Recorder::default();
    world.step(&mut recorder);

    assert_eq!(recorder.integrated, vec![mover]);
    assert_eq!(recorder.collisions, vec![(mover, sleeper)]);

    let light = world.config().light_deactivation;
    let body = world.body(sleeper).unwrap();
    assert!(body.is_active());
    assert_eq!(body.props.deactivate_count, light);
}

#[test]
fn disabled_body_takes_no_part() {
    let mut joints = [Joint::default(); 2];
    let mut connections = [Connection::default(); 0];
    let mut bodies = [Body::default(); 2];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, far_floor);

    let a = world.add_body(&BALL, F).unwrap();
    let ghost = world.add_body(&BALL, F).unwrap();
    world.body_mut(ghost).unwrap().props.flags.insert(BodyFlags::DISABLED);
    world.body_mut(a).unwrap().accelerate(Vec3::new(5, 0, 0));

    let mut recorder = Recorder::default();
    world.step(&mut recorder);

    assert!(recorder.collisions.is_empty());
    assert_eq!(world.body(ghost).unwrap().joints[0].position, Vec3::ZERO);
}

#[test]
fn stuck_nonrotating_body_undoes_its_move() {
    // the stick's ends poke into the walls of a narrow room
    fn room(p: Vec3, _: Unit) -> Vec3 {
        aabox_inside(p, Vec3::ZERO, Vec3::new(F, 4 * F, 4 * F))
    }

    let mut joints = [Joint::default(); 2];
    let mut connections = [Connection::default(); 1];
    let mut bodies = [Body::default(); 1];
    let mut world = World::new(&mut joints, &mut connections, &mut bodies, room);

    let stick = world.add_body(&Template::Stick { length: 2 * F, joint_size: F / 4 }, F).unwrap();
    {
        let mut body = world.body_mut(stick).unwrap();
        body.props.flags.insert(BodyFlags::NONROTATING);
        body.accelerate(Vec3::new(0, -7, 3));
    }

    let start: Vec<Vec3> = world.body(stick).unwrap().joints.iter().map(|j| j.position).collect();
    assert_eq!(start, vec![Vec3::new(F, 0, 0), Vec3::new(-F, 0, 0)]);

    for tick in 0..5 {
        world.step(&mut NoOpStepObserver);

        let body = world.body(stick).unwrap();
        let now: Vec<Vec3> = body.joints.iter().map(|j| j.position).collect();

        assert_eq!(now, start, "tick {}", tick);
        assert!(body.joints.iter().all(|j| j.velocity == [0; 3]), "tick {}", tick);
    }
}
