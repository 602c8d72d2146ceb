// ==========================================
// 航空主运单草稿 - 命令行入口
// ==========================================
// 用法:
//   draft-mawb [db_path] <command> <mawb_info_id> [args]
//
// 命令:
//   add-parent <mawb_info_id> <mawb_no> <carrier_code>
//   get | submit | confirm | reject | delete <mawb_info_id>
//   upsert <mawb_info_id> <request.json>
//   status <mawb_info_id> <STATUS>
//   render <mawb_info_id> [output_file]
//   config-set <key> <value>
//   config-show
// ==========================================

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use draft_mawb::api::DraftMawbRequest;
use draft_mawb::app::{get_default_db_path, AppState};
use draft_mawb::db::Deadline;
use draft_mawb::domain::MawbInfo;
use draft_mawb::repository::MawbInfoRepository;

const COMMANDS: &[&str] = &[
    "add-parent",
    "get",
    "upsert",
    "submit",
    "confirm",
    "reject",
    "status",
    "delete",
    "render",
    "config-set",
    "config-show",
];

// 单条命令的截止时间
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> anyhow::Result<()> {
    draft_mawb::logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    // 第一个参数不是命令时视为数据库路径
    let db_path = if COMMANDS.contains(&args[0].as_str()) {
        get_default_db_path()
    } else {
        args.remove(0)
    };
    let Some(command) = args.first().cloned() else {
        print_usage();
        bail!("缺少命令");
    };
    let rest = &args[1..];

    tracing::info!(version = draft_mawb::VERSION, db_path = %db_path, command = %command, "draft-mawb 启动");
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let api = &state.draft_mawb_api;
    let deadline = Deadline::after(COMMAND_TIMEOUT);

    match command.as_str() {
        "add-parent" => {
            let [id, mawb_no, carrier_code] = take_args::<3>(rest, "add-parent <mawb_info_id> <mawb_no> <carrier_code>")?;
            let info = MawbInfo {
                mawb_info_id: id,
                mawb_no,
                carrier_code,
                created_at: Local::now().naive_local(),
            };
            let conn = draft_mawb::db::open_sqlite_connection(&state.db_path)?;
            MawbInfoRepository::new().insert(&conn, &info)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        "get" => {
            let [id] = take_args::<1>(rest, "get <mawb_info_id>")?;
            print_json(&api.get(&id, deadline)?)?;
        }
        "upsert" => {
            let [id, file] = take_args::<2>(rest, "upsert <mawb_info_id> <request.json>")?;
            let raw = std::fs::read_to_string(&file).with_context(|| format!("读取请求文件失败: {}", file))?;
            let request: DraftMawbRequest =
                serde_json::from_str(&raw).with_context(|| format!("请求文件格式错误: {}", file))?;
            print_json(&api.create_or_update(&id, request, deadline)?)?;
        }
        "submit" => {
            let [id] = take_args::<1>(rest, "submit <mawb_info_id>")?;
            print_json(&api.submit(&id, deadline)?)?;
        }
        "confirm" => {
            let [id] = take_args::<1>(rest, "confirm <mawb_info_id>")?;
            print_json(&api.confirm(&id, deadline)?)?;
        }
        "reject" => {
            let [id] = take_args::<1>(rest, "reject <mawb_info_id>")?;
            print_json(&api.reject(&id, deadline)?)?;
        }
        "status" => {
            let [id, status] = take_args::<2>(rest, "status <mawb_info_id> <STATUS>")?;
            print_json(&api.change_status(&id, &status, deadline)?)?;
        }
        "delete" => {
            let [id] = take_args::<1>(rest, "delete <mawb_info_id>")?;
            api.delete(&id, deadline)?;
            println!("deleted mawb_info_id={}", id);
        }
        "render" => {
            let id = rest.first().cloned().ok_or_else(|| anyhow!("用法: render <mawb_info_id> [output_file]"))?;
            let doc = api.generate_document(&id, deadline)?;
            match rest.get(1) {
                Some(out) => {
                    std::fs::write(out, &doc.bytes).with_context(|| format!("写入文件失败: {}", out))?;
                    println!("{} ({} bytes) -> {}", doc.file_name, doc.bytes.len(), out);
                }
                None => print!("{}", String::from_utf8_lossy(&doc.bytes)),
            }
        }
        "config-set" => {
            let [key, value] = take_args::<2>(rest, "config-set <key> <value>")?;
            state
                .config_manager
                .update_config(&key, &value)
                .map_err(|e| anyhow!("写入配置失败: {}", e))?;
        }
        "config-show" => {
            let snapshot = state
                .config_manager
                .get_config_snapshot()
                .map_err(|e| anyhow!("读取配置失败: {}", e))?;
            println!("{}", snapshot);
        }
        other => {
            print_usage();
            bail!("未知命令: {}", other);
        }
    }

    let stats = api.engine().cache_stats();
    tracing::debug!(
        volumetric_hits = stats.volumetric.hits,
        chargeable_hits = stats.chargeable.hits,
        charges_hits = stats.charges.hits,
        "计算缓存统计"
    );
    Ok(())
}

fn take_args<const N: usize>(rest: &[String], usage: &str) -> anyhow::Result<[String; N]> {
    if rest.len() < N {
        bail!("用法: {}", usage);
    }
    let taken: Vec<String> = rest[..N].to_vec();
    taken.try_into().map_err(|_| anyhow!("用法: {}", usage))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    eprintln!("draft-mawb {}", draft_mawb::VERSION);
    eprintln!("用法: draft-mawb [db_path] <command> [args]");
    eprintln!("  add-parent <mawb_info_id> <mawb_no> <carrier_code>");
    eprintln!("  get | submit | confirm | reject | delete <mawb_info_id>");
    eprintln!("  upsert <mawb_info_id> <request.json>");
    eprintln!("  status <mawb_info_id> <DRAFT|PENDING|CONFIRMED|REJECTED>");
    eprintln!("  render <mawb_info_id> [output_file]");
    eprintln!("  config-set <key> <value>");
    eprintln!("  config-show");
}
