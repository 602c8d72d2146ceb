// ==========================================
// 草稿聚合仓储集成测试
// ==========================================
// 覆盖: 创建/整体替换、事务原子性、子表顺序、级联删除、
//       父文档检查、状态更新、截止时间
// ==========================================


use std::time::Instant;

use draft_mawb::db::Deadline;
use draft_mawb::domain::DraftMawbStatus;
use draft_mawb::logging;
use draft_mawb::repository::{DraftMawbRepository, RepositoryError};
use test_helpers::*;

#[test]
fn test_create_then_load_full_aggregate() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut draft = computed_draft(PARENT_ID, sample_request());
    let draft_id = repo
        .create_or_update(&mut conn, &mut draft, Deadline::none())
        .unwrap();
    println!("✓ 步骤 1: 草稿已创建 draft_id={}", draft_id);

    assert!(!draft_id.is_empty());
    assert_eq!(draft.draft_id, draft_id, "调用方的聚合应回填 draft_id");
    assert_eq!(draft.status, DraftMawbStatus::Draft);
    assert!(draft.items.iter().all(|i| i.item_id.is_some()), "明细应回填 item_id");

    let loaded = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    println!("✓ 步骤 2: 聚合已回读");

    assert_eq!(loaded.draft_id, draft_id);
    assert_eq!(loaded.items.len(), 2);
    assert_eq!(loaded.items[0].dimensions.len(), 1);
    assert_eq!(loaded.items[1].dimensions.len(), 1);
    assert_eq!(loaded.items[1].dimensions[0].count, "2");
    assert_eq!(loaded.charges.len(), 2);
    assert_eq!(loaded.total_pieces, 5);
    assert!((loaded.total_gross_weight - 180.0).abs() < 1e-9);
    assert!((loaded.total_amount - sample_total_amount()).abs() < 1e-6);
    assert_eq!(loaded.created_at, draft.created_at, "回读时间戳应与回填一致");
    assert_eq!(loaded.updated_at, draft.updated_at);
}

#[test]
fn test_get_by_parent_id_not_found() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();

    let err = DraftMawbRepository::new()
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap_err();
    assert!(err.is_not_found(), "无草稿时应返回 NotFound, 实际: {:?}", err);
}

#[test]
fn test_update_replaces_children_and_keeps_identity() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut first = computed_draft(PARENT_ID, sample_request());
    let draft_id = repo
        .create_or_update(&mut conn, &mut first, Deadline::none())
        .unwrap();

    // 第二次: 一条明细（两组尺寸）+ 一条费用
    let mut request = sample_request();
    request.items = vec![item(
        7,
        "250",
        12.5,
        vec![dim("50", "40", "30", "3"), dim("60", "40", "30", "4")],
    )];
    request.charges = vec![charge("AWB_FEE", 30.0)];
    let mut second = computed_draft(PARENT_ID, request);
    let second_id = repo
        .create_or_update(&mut conn, &mut second, Deadline::none())
        .unwrap();

    assert_eq!(second_id, draft_id, "同一父文档应沿用草稿ID");
    assert_eq!(second.created_at, first.created_at, "创建时间不应变化");

    let loaded = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].pieces, 7);
    assert_eq!(loaded.items[0].dimensions.len(), 2);
    assert_eq!(loaded.charges.len(), 1);
    assert_eq!(loaded.charges[0].value, 30.0);

    // 旧子行不应残留
    assert_eq!(child_row_counts(&conn, &draft_id).unwrap(), (1, 2, 1));
    assert_eq!(table_count(&conn, "draft_mawb").unwrap(), 1);
    assert_eq!(table_count(&conn, "draft_mawb_item").unwrap(), 1);
    assert_eq!(table_count(&conn, "draft_mawb_item_dimension").unwrap(), 2);
    assert_eq!(table_count(&conn, "draft_mawb_charge").unwrap(), 1);
}

#[test]
fn test_same_payload_twice_is_idempotent() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut a = computed_draft(PARENT_ID, sample_request());
    let mut b = computed_draft(PARENT_ID, sample_request());
    let id_a = repo.create_or_update(&mut conn, &mut a, Deadline::none()).unwrap();
    let after_first = child_row_counts(&conn, &id_a).unwrap();
    let id_b = repo.create_or_update(&mut conn, &mut b, Deadline::none()).unwrap();

    assert_eq!(id_a, id_b);
    assert_eq!(child_row_counts(&conn, &id_b).unwrap(), after_first);
    assert_eq!(after_first, (2, 2, 2));
}

#[test]
fn test_failed_update_rolls_back_whole_aggregate() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut original = computed_draft(PARENT_ID, sample_request());
    let draft_id = repo
        .create_or_update(&mut conn, &mut original, Deadline::none())
        .unwrap();
    let before = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    println!("✓ 步骤 1: 原始聚合已保存");

    // 三条明细,第二条件数为0 → 明细表 CHECK 约束失败
    let mut request = sample_request();
    request.shipper_name_address = "CHANGED SHIPPER".to_string();
    request.items = vec![
        item(1, "10", 1.0, vec![dim("10", "10", "10", "1")]),
        item(1, "20", 1.0, vec![dim("20", "20", "20", "1")]),
        item(1, "30", 1.0, vec![dim("30", "30", "30", "1")]),
    ];
    let mut broken = computed_draft(PARENT_ID, request);
    broken.items[1].pieces = 0;
    let broken_snapshot = broken.clone();

    let err = repo
        .create_or_update(&mut conn, &mut broken, Deadline::none())
        .unwrap_err();
    println!("✓ 步骤 2: 更新失败: {}", err);
    assert!(
        matches!(err, RepositoryError::CheckConstraintViolation(_)),
        "应为 CHECK 约束错误, 实际: {:?}",
        err
    );
    assert_eq!(broken, broken_snapshot, "失败时调用方的聚合不应被回填");

    let after = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    assert_eq!(after, before, "失败后聚合应与调用前完全一致");
    assert_eq!(after.shipper_name_address, "ACME ELECTRONICS LTD, SHANGHAI");
    assert_eq!(child_row_counts(&conn, &draft_id).unwrap(), (2, 2, 2));
    println!("✓ 步骤 3: 头行与子表均已回滚");
}

#[test]
fn test_children_keep_insertion_order_across_batches() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    // 超过单条语句的行数上限,走分批插入
    let mut request = sample_request();
    request.items = (1..=120)
        .map(|n| {
            let mut it = item(n, "10", 1.0, vec![dim(&n.to_string(), "10", "10", "1")]);
            it.commodity_description = format!("LINE {:03}", n);
            it
        })
        .collect();
    request.charges = vec![
        charge("STORAGE_FEE", 3.0),
        charge("FUEL_SURCHARGE", 1.0),
        charge("OTHER", 2.0),
    ];
    let mut draft = computed_draft(PARENT_ID, request);
    let draft_id = repo
        .create_or_update(&mut conn, &mut draft, Deadline::none())
        .unwrap();

    let loaded = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    assert_eq!(loaded.items.len(), 120);
    for (idx, it) in loaded.items.iter().enumerate() {
        let n = idx as i64 + 1;
        assert_eq!(it.pieces, n, "明细顺序错误 idx={}", idx);
        assert_eq!(it.commodity_description, format!("LINE {:03}", n));
        assert_eq!(it.dimensions.len(), 1);
        assert_eq!(it.dimensions[0].length, n.to_string(), "尺寸应挂在对应明细下");
        assert_eq!(it.item_id, draft.items[idx].item_id, "回填的 item_id 应与存储一致");
    }
    let values: Vec<f64> = loaded.charges.iter().map(|c| c.value).collect();
    assert_eq!(values, vec![3.0, 1.0, 2.0]);
    assert_eq!(child_row_counts(&conn, &draft_id).unwrap(), (120, 120, 3));
}

#[test]
fn test_create_with_missing_parent_fails() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    let repo = DraftMawbRepository::new();

    let mut draft = computed_draft("MI-MISSING", sample_request());
    let err = repo
        .create_or_update(&mut conn, &mut draft, Deadline::none())
        .unwrap_err();
    assert!(
        matches!(err, RepositoryError::ParentNotFound { ref parent_id } if parent_id == "MI-MISSING"),
        "应为 ParentNotFound, 实际: {:?}",
        err
    );
    assert_eq!(table_count(&conn, "draft_mawb").unwrap(), 0);

    let err = repo
        .validate_parent_exists(&conn, "MI-MISSING", Deadline::none())
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ParentNotFound { .. }));
}

#[test]
fn test_terminal_draft_cannot_be_rewritten() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut draft = computed_draft(PARENT_ID, sample_request());
    let draft_id = repo
        .create_or_update(&mut conn, &mut draft, Deadline::none())
        .unwrap();
    repo.update_status(&conn, &draft_id, "CONFIRMED", Deadline::none())
        .unwrap();

    let mut again = computed_draft(PARENT_ID, sample_request());
    let err = repo
        .create_or_update(&mut conn, &mut again, Deadline::none())
        .unwrap_err();
    assert!(
        matches!(err, RepositoryError::BusinessRuleViolation(_)),
        "终态草稿不可修改, 实际: {:?}",
        err
    );
    let status = repo
        .find_status_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    assert_eq!(status, Some(DraftMawbStatus::Confirmed));
}

#[test]
fn test_update_status_validation() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut draft = computed_draft(PARENT_ID, sample_request());
    let draft_id = repo
        .create_or_update(&mut conn, &mut draft, Deadline::none())
        .unwrap();

    let err = repo
        .update_status(&conn, &draft_id, "ARCHIVED", Deadline::none())
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidStatus(ref s) if s == "ARCHIVED"));

    let err = repo
        .update_status(&conn, "no-such-draft", "PENDING", Deadline::none())
        .unwrap_err();
    assert!(err.is_not_found(), "未知草稿应返回 NotFound, 实际: {:?}", err);

    let status = repo
        .update_status(&conn, &draft_id, "pending", Deadline::none())
        .unwrap();
    assert_eq!(status, DraftMawbStatus::Pending);
    let loaded = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    assert_eq!(loaded.status, DraftMawbStatus::Pending);
    assert!(loaded.updated_at >= loaded.created_at);
}

#[test]
fn test_delete_cascades_to_children() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut draft = computed_draft(PARENT_ID, sample_request());
    let draft_id = repo
        .create_or_update(&mut conn, &mut draft, Deadline::none())
        .unwrap();
    repo.delete(&mut conn, &draft_id, Deadline::none()).unwrap();

    assert_eq!(child_row_counts(&conn, &draft_id).unwrap(), (0, 0, 0));
    assert_eq!(table_count(&conn, "draft_mawb_item_dimension").unwrap(), 0);
    assert!(repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap_err()
        .is_not_found());

    let err = repo
        .delete(&mut conn, &draft_id, Deadline::none())
        .unwrap_err();
    assert!(err.is_not_found(), "重复删除应返回 NotFound, 实际: {:?}", err);
}

#[test]
fn test_expired_deadline_aborts_without_writing() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let mut conn = open_test_connection(&db_path).unwrap();
    seed_mawb_info(&conn, PARENT_ID).unwrap();
    let repo = DraftMawbRepository::new();

    let mut original = computed_draft(PARENT_ID, sample_request());
    repo.create_or_update(&mut conn, &mut original, Deadline::none())
        .unwrap();
    let before = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();

    let expired = Deadline::at(Instant::now());
    let mut request = sample_request();
    request.items.truncate(1);
    let mut changed = computed_draft(PARENT_ID, request);
    let err = repo
        .create_or_update(&mut conn, &mut changed, expired)
        .unwrap_err();
    assert!(
        matches!(err, RepositoryError::DeadlineExceeded { .. }),
        "应为 DeadlineExceeded, 实际: {:?}",
        err
    );

    let err = repo.get_by_parent_id(&conn, PARENT_ID, expired).unwrap_err();
    assert!(matches!(err, RepositoryError::DeadlineExceeded { ref stage } if stage == "load_header"));

    let after = repo
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    assert_eq!(after, before);
}
