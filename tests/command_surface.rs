use auscout::{
    counter_key, description_key, encode_frames, CommandError, Dispatcher, LookupConfig,
    RecordedReplication,
};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(LookupConfig::default())
}

#[test]
fn add_then_size_and_count() {
    let mut d = dispatcher();
    let reply = d
        .add("songs", &encode_frames(&[0x0000_0001, 0x0000_0002, 0x0000_0003]), None)
        .expect("add");
    assert!(reply.as_integer().is_some());

    assert_eq!(d.size("songs").expect("size").as_integer(), Some(3));
    assert_eq!(d.count("songs").expect("count").as_integer(), Some(1));
}

#[test]
fn duplicate_adjacent_frames_are_suppressed() {
    let mut d = dispatcher();
    let id = d
        .add("songs", &encode_frames(&[0x10, 0x10, 0x10, 0x20]), None)
        .expect("add")
        .as_integer()
        .expect("id reply");

    assert_eq!(d.size("songs").expect("size").as_integer(), Some(2));

    let index = d
        .keyspace()
        .index("songs")
        .expect("typed access")
        .expect("key exists");
    let positions: Vec<u32> = index
        .track_frames(id)
        .expect("track exists")
        .map(|f| f.pos)
        .collect();
    assert_eq!(positions, vec![0, 3]);
}

#[test]
fn delete_reports_entry_count_then_fails() {
    let mut d = dispatcher();
    let id = d
        .add("songs", &encode_frames(&[1, 2, 3]), None)
        .expect("add")
        .as_integer()
        .expect("id reply");

    let reply = d.del("songs", id).expect("del");
    assert_eq!(reply.as_integer(), Some(3));
    assert_eq!(d.size("songs").expect("size").as_integer(), Some(0));

    let err = d.del("songs", id).expect_err("second del");
    assert!(matches!(err, CommandError::UnknownId));
    assert_eq!(err.to_string(), "no such id found");
}

#[test]
fn duplicate_id_fails_without_mutating() {
    let mut d = dispatcher();
    d.add("songs", &encode_frames(&[1, 2, 3]), Some(7))
        .expect("first add");

    let err = d
        .add("songs", &encode_frames(&[4, 5, 6]), Some(7))
        .expect_err("duplicate id");
    assert!(matches!(err, CommandError::DuplicateId));

    assert_eq!(d.size("songs").expect("size").as_integer(), Some(3));
    assert_eq!(d.count("songs").expect("count").as_integer(), Some(1));
}

#[test]
fn foreign_typed_key_is_a_type_conflict() {
    let mut d = dispatcher();
    d.keyspace_mut().incr_by("songs", 1).expect("occupy key");

    let err = d
        .add("songs", &encode_frames(&[1, 2]), None)
        .expect_err("type conflict");
    assert!(matches!(err, CommandError::WrongType));
    assert_eq!(
        err.to_string(),
        "key exists for different type. Delete first."
    );

    // size/count surface the conflict too instead of replying 0.
    assert!(matches!(d.size("songs"), Err(CommandError::WrongType)));
    assert!(matches!(d.count("songs"), Err(CommandError::WrongType)));
}

#[test]
fn missing_key_handling_per_command() {
    let mut d = dispatcher();
    assert_eq!(d.size("nope").expect("size").as_integer(), Some(0));
    assert_eq!(d.count("nope").expect("count").as_integer(), Some(0));

    assert!(matches!(d.del("nope", 1), Err(CommandError::NoSuchKey)));
    assert!(matches!(d.del_key("nope"), Err(CommandError::NoSuchKey)));
    assert!(matches!(d.list_tracks("nope"), Err(CommandError::NoSuchKey)));
    assert!(matches!(d.list_hashes("nope"), Err(CommandError::NoSuchKey)));

    let probe = encode_frames(&[1u32; 4]);
    assert!(matches!(
        d.lookup("nope", &probe, &probe, None),
        Err(CommandError::NoSuchKey)
    ));
}

#[test]
fn addtrack_stores_description_and_del_removes_it() {
    let mut d = dispatcher();
    let id = d
        .add_track("songs", &encode_frames(&[1, 2, 3]), "a song", None)
        .expect("addtrack")
        .as_integer()
        .expect("id reply");

    assert_eq!(d.keyspace().description("songs", id), Some("a song"));
    assert!(d.keyspace().contains(&description_key("songs", id)));

    d.del("songs", id).expect("del");
    assert_eq!(d.keyspace().description("songs", id), None);
}

#[test]
fn delkey_tears_down_index_and_side_keys() {
    let mut d = dispatcher();
    let id = d
        .add_track("songs", &encode_frames(&[1, 2, 3]), "a song", None)
        .expect("addtrack")
        .as_integer()
        .expect("id reply");

    let reply = d.del_key("songs").expect("delkey");
    assert_eq!(reply.as_simple(), Some("OK"));

    assert!(!d.keyspace().contains("songs"));
    assert!(!d.keyspace().contains(&counter_key("songs")));
    assert!(!d.keyspace().contains(&description_key("songs", id)));

    // Idempotence law: a second delkey reports a missing key.
    assert!(matches!(d.del_key("songs"), Err(CommandError::NoSuchKey)));
    assert_eq!(d.size("songs").expect("size").as_integer(), Some(0));
}

#[test]
fn debug_listers_reply_with_counts() {
    let mut d = dispatcher();
    d.add("songs", &encode_frames(&[1, 2, 3]), Some(1))
        .expect("first");
    d.add("songs", &encode_frames(&[3, 4]), Some(2)).expect("second");

    assert_eq!(d.list_tracks("songs").expect("list").as_integer(), Some(2));
    // Hash slots: 1, 2, 3, 4.
    assert_eq!(d.list_hashes("songs").expect("index").as_integer(), Some(4));
}

#[test]
fn successful_writes_are_replicated() {
    let sink = RecordedReplication::new();
    let mut d = Dispatcher::new(LookupConfig::default()).with_replication(Box::new(sink.clone()));

    let hashbytes = encode_frames(&[1, 2, 3]);
    d.add("songs", &hashbytes, Some(5)).expect("add");
    d.add_track("songs", &hashbytes, "desc", Some(6))
        .expect("addtrack");
    d.del("songs", 5).expect("del");

    let records = sink.records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0], vec![b"add".to_vec(), b"songs".to_vec(), hashbytes.clone(), b"5".to_vec()]);
    assert_eq!(
        records[1],
        vec![
            b"addtrack".to_vec(),
            b"songs".to_vec(),
            hashbytes.clone(),
            b"desc".to_vec(),
            b"6".to_vec()
        ]
    );
    assert_eq!(records[2], vec![b"del".to_vec(), b"songs".to_vec(), b"5".to_vec()]);
}

#[test]
fn failed_writes_are_not_replicated() {
    let sink = RecordedReplication::new();
    let mut d = Dispatcher::new(LookupConfig::default()).with_replication(Box::new(sink.clone()));

    d.add("songs", &encode_frames(&[1]), Some(9)).expect("seed");
    sink.clear();

    let _ = d.add("songs", &encode_frames(&[2]), Some(9)).expect_err("duplicate");
    let _ = d.del("songs", 1234).expect_err("unknown id");
    assert!(sink.is_empty());
}

#[test]
fn argv_surface_round_trips() {
    let mut d = dispatcher();
    let hashbytes = encode_frames(&[10, 20, 30]);

    let reply = d
        .execute(&[b"addtrack", b"songs", &hashbytes, b"via argv", b"77"])
        .expect("addtrack argv");
    assert_eq!(reply.as_integer(), Some(77));

    let probe = encode_frames(&[10u32; 150]);
    let toggles = encode_frames(&[0u32; 150]);
    let reply = d
        .execute(&[b"lookup", b"songs", &probe, &toggles, b"0.5"])
        .expect("lookup argv");
    assert!(reply.as_array().is_some());

    assert!(matches!(
        d.execute(&[b"lookup", b"songs", &probe, &toggles, b"high"]),
        Err(CommandError::BadThreshold)
    ));

    let reply = d.execute(&[b"delkey", b"songs"]).expect("delkey argv");
    assert_eq!(reply.as_simple(), Some("OK"));
}

#[test]
fn unaligned_hash_buffer_is_rejected() {
    let mut d = dispatcher();
    let err = d.add("songs", &[1, 2, 3], None).expect_err("unaligned");
    assert!(matches!(err, CommandError::UnalignedFrames));
    assert!(!d.keyspace().contains("songs"));
}
