use std::sync::Arc;

use tagcore::{
    ChannelTransport, DataType, EngineConfig, ErrorKind, EventKind, EventOptions, MemoryTagTable, ModuleId, TagEngine,
    TagFlags, TagHandle, TagIndex,
};

const HMI: ModuleId = ModuleId::new(1);
const HISTORIAN: ModuleId = ModuleId::new(2);

fn setup() -> (TagEngine<MemoryTagTable>, Arc<ChannelTransport>) {
    let transport = Arc::new(ChannelTransport::new(64));
    let engine = TagEngine::new(MemoryTagTable::new(), transport.clone());
    (engine, transport)
}

fn add(engine: &TagEngine<MemoryTagTable>, name: &str, dt: DataType, count: usize, flags: TagFlags) -> TagIndex {
    engine.with_table(|t| t.add_tag(name, dt, count, flags)).unwrap().unwrap()
}

fn whole(engine: &TagEngine<MemoryTagTable>, index: TagIndex) -> TagHandle {
    engine.with_table(|t| t.handle(index)).unwrap().unwrap()
}

#[test]
fn delete_fires_deleted_events_once_and_drops_everything() {
    let (e, transport) = setup();
    let hmi = transport.connect(HMI).unwrap();
    let hist = transport.connect(HISTORIAN).unwrap();
    let tank = add(&e, "tank_level", DataType::Real, 1, TagFlags::NONE);
    let alarm = add(&e, "tank_alarm", DataType::Real, 1, TagFlags::NONE);
    let h = whole(&e, tank);

    let gone = e.event_add(h, EventKind::Deleted, &[], HMI).unwrap();
    e.event_add(h, EventKind::Change, &[], HMI).unwrap();
    e.event_add(h, EventKind::Write, &[], HISTORIAN).unwrap();
    e.map_add(h, whole(&e, alarm)).unwrap();
    assert_eq!(e.event_count(HMI).unwrap(), 2);
    assert_eq!(e.event_count(HISTORIAN).unwrap(), 1);

    // Writes never trigger DELETED events.
    e.write(tank, 0, &1.5f32.to_le_bytes()).unwrap();
    let kinds: Vec<_> = hmi.drain().unwrap().into_iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![EventKind::Change]);
    assert_eq!(hist.drain().unwrap().len(), 1);

    assert_eq!(e.delete_tag(tank).unwrap(), 1);
    let note = hmi.try_recv().unwrap().expect("deleted notification");
    assert_eq!((note.index, note.id, note.kind), (tank, gone, EventKind::Deleted));
    assert!(note.data.is_empty());
    assert!(hmi.is_empty());
    assert!(hist.is_empty());

    assert_eq!(e.event_count(HMI).unwrap(), 0);
    assert_eq!(e.event_count(HISTORIAN).unwrap(), 0);

    // The tag is gone for every operation.
    assert_eq!(e.write(tank, 0, &[0; 4]).unwrap_err().kind(), ErrorKind::Deleted);
    assert_eq!(e.read(tank, 0, 4).unwrap_err().kind(), ErrorKind::Deleted);
    assert!(e.events_of(tank).unwrap().is_empty());
    assert_eq!(e.event_add(h, EventKind::Write, &[], HMI).unwrap_err().kind(), ErrorKind::Deleted);
    assert_eq!(e.map_add(h, whole(&e, alarm)).unwrap_err().kind(), ErrorKind::Deleted);
    assert_eq!(e.delete_tag(tank).unwrap_err().kind(), ErrorKind::Deleted);
    assert!(hmi.is_empty());

    // The name is free for a new tag at a new index.
    let again = add(&e, "tank_level", DataType::Real, 1, TagFlags::NONE);
    assert_ne!(again, tank);
    assert!(e.events_of(again).unwrap().is_empty());
}

#[test]
fn deleted_event_can_carry_the_last_value() {
    let (e, transport) = setup();
    let hmi = transport.connect(HMI).unwrap();
    let t = add(&e, "setpoint", DataType::Int, 2, TagFlags::NONE);
    e.write(t, 0, &[1, 0, 2, 0]).unwrap();
    let id = e.event_add(whole(&e, t), EventKind::Deleted, &[], HMI).unwrap();
    e.event_opt(t, id, EventOptions::SEND_DATA, HMI).unwrap();

    assert_eq!(e.event_del_check(t).unwrap(), 1);
    assert_eq!(hmi.recv().unwrap().data, vec![1, 0, 2, 0]);

    e.delete_tag(t).unwrap();
    assert_eq!(hmi.recv().unwrap().data, vec![1, 0, 2, 0]);
}

#[test]
fn cleanup_removes_only_the_modules_events() {
    let (e, _) = setup();
    let tags: Vec<_> = (0..4)
        .map(|i| add(&e, &format!("t{i}"), DataType::Dint, 1, TagFlags::NONE))
        .collect();
    for &t in &tags {
        e.event_add(whole(&e, t), EventKind::Write, &[], HMI).unwrap();
    }
    let kept = e.event_add(whole(&e, tags[1]), EventKind::Write, &[], HISTORIAN).unwrap();

    assert_eq!(e.events_cleanup(HMI).unwrap(), 4);
    assert_eq!(e.event_count(HMI).unwrap(), 0);
    assert_eq!(e.events_cleanup(HMI).unwrap(), 0);
    assert_eq!(e.event_count(HISTORIAN).unwrap(), 1);
    assert_eq!(e.event_get(tags[1], kept).unwrap().owner, HISTORIAN);
    for &t in &[tags[0], tags[2], tags[3]] {
        assert!(e.events_of(t).unwrap().is_empty());
    }
}

#[test]
fn only_the_owner_may_change_an_event() {
    let (e, _) = setup();
    let t = add(&e, "speed", DataType::Uint, 1, TagFlags::NONE);
    let id = e.event_add(whole(&e, t), EventKind::Write, &[], HMI).unwrap();

    assert_eq!(e.event_del(t, id, HISTORIAN).unwrap_err().kind(), ErrorKind::Unauthorized);
    assert_eq!(
        e.event_opt(t, id, EventOptions::SEND_DATA, HISTORIAN).unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
    assert_eq!(e.event_get(t, id).unwrap().options, EventOptions::empty());

    e.event_del(t, id, HMI).unwrap();
    assert_eq!(e.event_del(t, id, HMI).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(e.event_count(HMI).unwrap(), 0);
}

#[test]
fn queue_tags_take_whole_write_events_only() {
    let (e, transport) = setup();
    let hmi = transport.connect(HMI).unwrap();
    let q = add(&e, "_queue", DataType::Dint, 2, TagFlags::QUEUE);
    let clock = add(&e, "_time", DataType::Time, 1, TagFlags::VIRTUAL);

    let part = TagHandle::elements(q, DataType::Dint, 1, 1).unwrap();
    assert_eq!(
        e.event_add(part, EventKind::Write, &[], HMI).unwrap_err().kind(),
        ErrorKind::IllegalOnTagKind
    );
    assert_eq!(
        e.event_add(whole(&e, q), EventKind::Change, &[], HMI).unwrap_err().kind(),
        ErrorKind::IllegalOnTagKind
    );
    assert_eq!(
        e.event_add(whole(&e, clock), EventKind::Write, &[], HMI).unwrap_err().kind(),
        ErrorKind::IllegalOnTagKind
    );

    let id = e.event_add(whole(&e, q), EventKind::Write, &[], HMI).unwrap();
    e.event_opt(q, id, EventOptions::SEND_DATA, HMI).unwrap();
    e.write(q, 0, &[1, 0, 0, 0, 2, 0, 0, 0]).unwrap();
    let note = hmi.recv().unwrap();
    assert_eq!(note.kind, EventKind::Write);
    assert_eq!(note.data, vec![1, 0, 0, 0, 2, 0, 0, 0]);

    assert_eq!(e.write(clock, 0, &[0; 4]).unwrap_err().kind(), ErrorKind::IllegalOnTagKind);
}

#[test]
fn read_only_tags_still_host_events() {
    let (e, _) = setup();
    let t = add(&e, "serial", DataType::Udint, 1, TagFlags::READ_ONLY);
    assert!(e.event_add(whole(&e, t), EventKind::Change, &[], HMI).is_ok());
}

#[test]
fn engine_from_json_config() {
    let cfg = EngineConfig::from_json_str(r#"{ "max_map_hops": 1, "max_message_size": 20 }"#).unwrap();
    let transport = Arc::new(ChannelTransport::from_config(&cfg));
    let e = TagEngine::with_config(MemoryTagTable::new(), transport.clone(), cfg).unwrap();
    let hmi = transport.connect(HMI).unwrap();
    assert_eq!(e.config().max_map_hops, 1);

    let a = add(&e, "a", DataType::Dint, 2, TagFlags::NONE);
    let b = add(&e, "b", DataType::Dint, 2, TagFlags::NONE);
    let c = add(&e, "c", DataType::Dint, 2, TagFlags::NONE);
    e.map_add(whole(&e, a), whole(&e, b)).unwrap();
    e.map_add(whole(&e, b), whole(&e, c)).unwrap();
    let report = e.write(a, 0, &[7; 8]).unwrap();
    assert_eq!(report.propagation.applied, 1);
    assert!(report.overflow.is_some());

    // Eight bytes of data do not fit in a twenty byte message.
    let id = e.event_add(whole(&e, a), EventKind::Write, &[], HMI).unwrap();
    e.event_opt(a, id, EventOptions::SEND_DATA, HMI).unwrap();
    assert_eq!(e.write(a, 0, &[1; 8]).unwrap().notified, 0);
    assert!(hmi.is_empty());

    let err = TagEngine::with_config(
        MemoryTagTable::new(),
        transport,
        EngineConfig {
            max_message_size: 8,
            ..EngineConfig::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooBig);
}
