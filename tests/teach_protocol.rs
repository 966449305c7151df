//! Teach protocol tests: the learn-mode gate, opcode handlers and
//! response payloads.

use evtable::{
    parse_event, CmdErr, EventKey, EventTable, Mode, Opcode, Response, TableConfig, TeachEngine,
};

fn learn(engine: &mut TeachEngine, table: &mut EventTable) {
    engine.dispatch(table, Opcode::Nnlrn, &[]);
    assert_eq!(engine.mode(), Mode::Learn);
}

/// EVLRN payload: NN, EN (big-endian), 1-based EV number, value.
fn evlrn(nn: u16, en: u16, ev_num: u8, ev_val: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&nn.to_be_bytes());
    data.extend_from_slice(&en.to_be_bytes());
    data.push(ev_num);
    data.push(ev_val);
    data
}

// ==================== Mode Gate ====================

#[test]
fn test_mutations_rejected_outside_learn_mode() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();

    for (opcode, data) in [
        (Opcode::Evlrn, evlrn(1, 100, 1, 5)),
        (Opcode::Evuln, vec![0, 1, 0, 100]),
        (Opcode::Nnclr, Vec::new()),
        (Opcode::Reqev, vec![0, 1, 0, 100, 1]),
    ] {
        let replies = engine.dispatch(&mut table, opcode, &data);
        assert_eq!(replies, vec![Response::CmdErr(CmdErr::NotLearn)]);
    }
    assert_eq!(table.stored_count(), 0);
}

#[test]
fn test_learn_mode_entry_and_exit() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    assert_eq!(engine.mode(), Mode::Normal);

    engine.dispatch(&mut table, Opcode::Nnlrn, &[]);
    assert_eq!(engine.mode(), Mode::Learn);

    engine.dispatch(&mut table, Opcode::Nnuln, &[]);
    assert_eq!(engine.mode(), Mode::Normal);

    // Mutations work again only after re-entering learn mode.
    let replies = engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 1, 1, 1));
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::NotLearn)]);
}

// ==================== Teach / Unlearn ====================

#[test]
fn test_evlrn_teaches_and_acks() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);

    let replies = engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 100, 1, 42));
    assert_eq!(replies, vec![Response::Ack]);

    let idx = table.find_event(EventKey::new(1, 100)).unwrap();
    assert_eq!(table.get_ev(idx, 0).unwrap(), 42);
}

#[test]
fn test_evlrn_reteach_updates_in_place() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);

    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(2, 200, 1, 1));
    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(2, 200, 1, 2));

    assert_eq!(table.stored_count(), 1);
    let idx = table.find_event(EventKey::new(2, 200)).unwrap();
    assert_eq!(table.get_ev(idx, 0).unwrap(), 2);
}

#[test]
fn test_evlrn_rejects_ev_number_zero() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);

    let replies = engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 1, 0, 5));
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::InvEvIndex)]);
}

#[test]
fn test_evlrn_on_full_table() {
    let config = TableConfig {
        capacity: 1,
        row_width: 4,
        evs_per_event: 8,
        buckets: 2,
    };
    let mut table = EventTable::new(config).unwrap();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);

    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 1, 1, 1));
    let replies = engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 2, 1, 1));
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::TooManyEvents)]);
}

#[test]
fn test_evlrni_addresses_cross_row_index() {
    let config = TableConfig {
        capacity: 8,
        row_width: 4,
        evs_per_event: 12,
        buckets: 4,
    };
    let mut table = EventTable::new(config).unwrap();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);

    // EVLRNI payload carries an event ordinal byte before the EV number.
    let data = vec![0, 1, 0, 100, 0, 9, 77]; // EV#9 lands in a continuation row
    let replies = engine.dispatch(&mut table, Opcode::Evlrni, &data);
    assert_eq!(replies, vec![Response::Ack]);

    let idx = table.find_event(EventKey::new(1, 100)).unwrap();
    assert_eq!(table.get_ev(idx, 8).unwrap(), 77);
}

#[test]
fn test_evuln_removes_silently_and_reports_unknown() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);

    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 100, 1, 5));
    let replies = engine.dispatch(&mut table, Opcode::Evuln, &[0, 1, 0, 100]);
    assert!(replies.is_empty());
    assert_eq!(table.find_event(EventKey::new(1, 100)), None);

    let replies = engine.dispatch(&mut table, Opcode::Evuln, &[0, 1, 0, 100]);
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::InvalidEvent)]);
}

#[test]
fn test_nnclr_wipes_in_learn_mode() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    for en in 0..5 {
        engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, en, 1, 1));
    }

    let replies = engine.dispatch(&mut table, Opcode::Nnclr, &[]);
    assert_eq!(replies, vec![Response::Ack]);
    assert_eq!(table.stored_count(), 0);
    assert_eq!(table.free_slots(), table.capacity());
}

// ==================== Queries ====================

#[test]
fn test_capacity_and_count_reports() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    for en in 0..3 {
        engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, en, 1, 1));
    }
    engine.dispatch(&mut table, Opcode::Nnuln, &[]);

    let replies = engine.dispatch(&mut table, Opcode::Nnevn, &[]);
    assert_eq!(
        replies,
        vec![Response::EventSlotsLeft((table.capacity() - 3) as u8)]
    );
    let replies = engine.dispatch(&mut table, Opcode::Rqevn, &[]);
    assert_eq!(replies, vec![Response::StoredCount(3)]);
}

#[test]
fn test_nerd_enumerates_all_stored_events() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    for en in 10..13 {
        engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(4, en, 1, 1));
    }

    let replies = engine.dispatch(&mut table, Opcode::Nerd, &[]);
    assert_eq!(replies.len(), 3);
    for (i, reply) in replies.iter().enumerate() {
        assert_eq!(
            *reply,
            Response::StoredEvent {
                nn: 4,
                en: 10 + i as u16,
                ordinal: i as u8 + 1,
            }
        );
    }
}

#[test]
fn test_nenrd_reads_one_event_by_ordinal() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(7, 70, 1, 1));

    let replies = engine.dispatch(&mut table, Opcode::Nenrd, &[1]);
    assert_eq!(
        replies,
        vec![Response::StoredEvent {
            nn: 7,
            en: 70,
            ordinal: 1
        }]
    );
    let replies = engine.dispatch(&mut table, Opcode::Nenrd, &[2]);
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::InvalidEvent)]);
}

#[test]
fn test_reval_reads_by_ordinal_and_ev_number() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 100, 2, 55));

    let replies = engine.dispatch(&mut table, Opcode::Reval, &[1, 2]);
    assert_eq!(
        replies,
        vec![Response::EvValueByIndex {
            ordinal: 1,
            ev_num: 2,
            value: 55
        }]
    );

    // EV number 0 is invalid on the wire; unwritten EVs report NoEv.
    let replies = engine.dispatch(&mut table, Opcode::Reval, &[1, 0]);
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::InvEvIndex)]);
    let replies = engine.dispatch(&mut table, Opcode::Reval, &[1, 5]);
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::NoEv)]);
}

#[test]
fn test_reqev_answers_with_event_context() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(3, 300, 1, 9));

    let replies = engine.dispatch(&mut table, Opcode::Reqev, &[0x00, 0x03, 0x01, 0x2C, 1]);
    assert_eq!(
        replies,
        vec![Response::EvAnswer {
            nn: 3,
            en: 300,
            ev_num: 1,
            value: 9
        }]
    );

    let replies = engine.dispatch(&mut table, Opcode::Reqev, &[0, 9, 0, 9, 1]);
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::InvalidEvent)]);
}

#[test]
fn test_reqev_zero_enumerates_all_variables() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    for ev_num in 1..=3u8 {
        engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(5, 50, ev_num, ev_num * 11));
    }

    let replies = engine.dispatch(&mut table, Opcode::Reqev, &[0, 5, 0, 50, 0]);
    assert_eq!(replies.len(), 4);
    assert_eq!(
        replies[0],
        Response::EvAnswer {
            nn: 5,
            en: 50,
            ev_num: 0,
            value: 3
        }
    );
    for ev_num in 1..=3u8 {
        assert_eq!(
            replies[ev_num as usize],
            Response::EvAnswer {
                nn: 5,
                en: 50,
                ev_num,
                value: ev_num * 11
            }
        );
    }
}

#[test]
fn test_queries_bypass_learn_gate() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(1, 1, 1, 1));

    // Still in learn mode: reads are answered.
    let replies = engine.dispatch(&mut table, Opcode::Rqevn, &[]);
    assert_eq!(replies, vec![Response::StoredCount(1)]);
    let replies = engine.dispatch(&mut table, Opcode::Reval, &[1, 1]);
    assert_eq!(
        replies,
        vec![Response::EvValueByIndex {
            ordinal: 1,
            ev_num: 1,
            value: 1
        }]
    );
}

#[test]
fn test_malformed_payload_length() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);

    let replies = engine.dispatch(&mut table, Opcode::Evlrn, &[0, 1, 0]);
    assert_eq!(replies, vec![Response::CmdErr(CmdErr::InvalidCommand)]);
}

// ==================== Consumption Path ====================

#[test]
fn test_match_event_resolves_taught_events() {
    let mut table = EventTable::default();
    let mut engine = TeachEngine::new();
    learn(&mut engine, &mut table);
    engine.dispatch(&mut table, Opcode::Evlrn, &evlrn(0x0102, 0x0304, 1, 1));

    // An ACON frame for the taught event resolves to its record.
    let parsed = parse_event(0x90, &[0x01, 0x02, 0x03, 0x04]).unwrap();
    let idx = engine.match_event(&table, &parsed).unwrap();
    assert_eq!(table.key_of(idx).unwrap(), EventKey::new(0x0102, 0x0304));

    // An untaught event does not.
    let parsed = parse_event(0x90, &[0x01, 0x02, 0x03, 0x05]).unwrap();
    assert_eq!(engine.match_event(&table, &parsed), None);
}

#[test]
fn test_response_opcodes() {
    assert_eq!(Response::Ack.opcode(), 0x59);
    assert_eq!(Response::CmdErr(CmdErr::NotLearn).opcode(), 0x6F);
    assert_eq!(Response::EventSlotsLeft(1).opcode(), 0x70);
    assert_eq!(Response::StoredCount(1).opcode(), 0x74);
    assert_eq!(
        Response::StoredEvent {
            nn: 0,
            en: 0,
            ordinal: 1
        }
        .opcode(),
        0xF2
    );
}
