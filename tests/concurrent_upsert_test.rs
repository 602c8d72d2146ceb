// ==========================================
// 并发写入测试
// ==========================================
// 场景: 多个写者同时对同一父文档执行 CreateOrUpdate
// 期望: 只有一张草稿; 子表完整来自某一个写者,不出现混合
// ==========================================


use std::sync::Arc;
use std::thread;

use draft_mawb::db::Deadline;
use draft_mawb::logging;
use draft_mawb::repository::DraftMawbRepository;
use test_helpers::*;

const WRITERS: usize = 8;

// 写者 k 写入 k+1 条明细与 k+1 条费用,件数均为 k+1
fn request_for_writer(k: usize) -> draft_mawb::api::DraftMawbRequest {
    let n = k + 1;
    let mut request = sample_request();
    request.items = (0..n)
        .map(|_| item(n as i64, "10", 1.0, vec![dim("10", "10", "10", "1")]))
        .collect();
    request.charges = (0..n).map(|_| charge("OTHER", n as f64)).collect();
    request
}

#[test]
fn test_concurrent_repository_writers_on_separate_connections() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    {
        let conn = open_test_connection(&db_path).unwrap();
        seed_mawb_info(&conn, PARENT_ID).unwrap();
    }

    let handles: Vec<_> = (0..WRITERS)
        .map(|k| {
            let db_path = db_path.clone();
            thread::spawn(move || {
                let mut conn = open_test_connection(&db_path).unwrap();
                let mut draft = computed_draft(PARENT_ID, request_for_writer(k));
                DraftMawbRepository::new()
                    .create_or_update(&mut conn, &mut draft, Deadline::none())
                    .unwrap()
            })
        })
        .collect();

    let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    println!("✓ 步骤 1: {} 个写者全部成功", ids.len());
    assert!(ids.windows(2).all(|w| w[0] == w[1]), "所有写者应得到同一草稿ID");

    let conn = open_test_connection(&db_path).unwrap();
    assert_eq!(table_count(&conn, "draft_mawb").unwrap(), 1);

    let loaded = DraftMawbRepository::new()
        .get_by_parent_id(&conn, PARENT_ID, Deadline::none())
        .unwrap();
    let n = loaded.items.len();
    assert!((1..=WRITERS).contains(&n));
    assert_eq!(loaded.charges.len(), n, "子表应来自同一写者");
    assert!(loaded.items.iter().all(|i| i.pieces == n as i64));
    assert!(loaded.charges.iter().all(|c| c.value == n as f64));
    assert_eq!(loaded.total_pieces, (n * n) as i64, "头行合计应与子表同源");
    assert_eq!(child_row_counts(&conn, &ids[0]).unwrap(), (n as i64, n as i64, n as i64));
    println!("✓ 步骤 2: 最终聚合来自写者 {}", n - 1);
}

#[test]
fn test_concurrent_api_writers_share_one_service() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let (conn, api) = create_test_api(&db_path).unwrap();
    seed_mawb_info(&conn.lock().unwrap(), PARENT_ID).unwrap();
    let api = Arc::new(api);

    let handles: Vec<_> = (0..WRITERS)
        .map(|k| {
            let api = Arc::clone(&api);
            thread::spawn(move || {
                api.create_or_update(PARENT_ID, request_for_writer(k), Deadline::none())
                    .unwrap()
            })
        })
        .collect();
    let responses: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let draft_id = &responses[0].draft.draft_id;
    assert!(responses.iter().all(|r| &r.draft.draft_id == draft_id));

    let current = api.get(PARENT_ID, Deadline::none()).unwrap();
    let n = current.draft.items.len();
    assert_eq!(current.draft.charges.len(), n);
    assert!((current.draft.total_amount - (10 * n + n * n) as f64).abs() < 1e-6);
    assert_eq!(table_count(&conn.lock().unwrap(), "draft_mawb").unwrap(), 1);
}
