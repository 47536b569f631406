use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use resx_editor::{
    select_group, DirectoryWatcher, EditError, EditorSession, EditorSettings, Group, ResourceStore, ResxFileStore,
    RowFilter,
};

#[derive(Parser)]
#[command(name = "resx_editor")]
#[command(about = "把同一组的多语言 .resx 文件当作一张表来查看和编辑")]
#[command(version)]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 设置文件路径（默认使用系统配置目录）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 扫描目录，列出资源组
    Scan {
        directory: PathBuf,
    },
    /// 打印资源组的表格
    Show {
        directory: PathBuf,
        /// 资源组名
        #[arg(short, long)]
        group: String,
        /// 只显示键或值包含该文本的行
        #[arg(long)]
        filter: Option<String>,
        /// 只显示有空单元格的行
        #[arg(long)]
        blanks: bool,
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 交互式编辑资源组
    Edit {
        directory: PathBuf,
        #[arg(short, long)]
        group: String,
        /// 把该资源组加入收藏
        #[arg(long)]
        remember: bool,
    },
    /// 列出收藏的资源组
    Saved,
    /// 取消收藏
    Forget {
        directory: PathBuf,
        #[arg(short, long)]
        group: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings_path = cli.config.clone().or_else(EditorSettings::default_path);
    let settings = settings_path
        .as_deref()
        .map(EditorSettings::load_or_default)
        .unwrap_or_default();

    match &cli.command {
        Command::Scan { directory } => handle_scan(directory),
        Command::Show {
            directory,
            group,
            filter,
            blanks,
            json,
        } => handle_show(directory, group, filter.as_deref(), *blanks, *json),
        Command::Edit {
            directory,
            group,
            remember,
        } => {
            if *remember {
                remember_group(settings_path.as_deref(), settings.clone(), group, directory)?;
            }
            handle_edit(directory, group, &settings)
        }
        Command::Saved => {
            handle_saved(&settings);
            Ok(())
        }
        Command::Forget { directory, group } => handle_forget(settings_path.as_deref(), settings, group, directory),
    }
}

/// 初始化日志（RUST_LOG 优先）
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// 处理目录扫描
fn handle_scan(directory: &Path) -> Result<()> {
    let groups = ResxFileStore::new()
        .scan(directory)
        .with_context(|| format!("扫描目录失败: {:?}", directory))?;

    if groups.is_empty() {
        println!("未找到资源文件");
        return Ok(());
    }
    for group in &groups {
        println!("{} ({:?})", group.name, group.directory);
        println!("  语言: {}", group.languages().join(", "));
    }
    println!("共 {} 个资源组", groups.len());
    Ok(())
}

/// 处理表格打印
fn handle_show(directory: &Path, name: &str, filter: Option<&str>, blanks: bool, json: bool) -> Result<()> {
    let store = ResxFileStore::new();
    let group = find_group(&store, directory, name)?;
    let mut session = EditorSession::open(store, group)?;
    session.set_filter(RowFilter {
        query: filter.unwrap_or_default().to_string(),
        blanks_only: blanks,
    });

    if json {
        let rows = session.displayed_rows();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&session);
    }
    Ok(())
}

/// 处理交互式编辑
fn handle_edit(directory: &Path, name: &str, settings: &EditorSettings) -> Result<()> {
    let store = ResxFileStore::new().with_backups(settings.backup_before_write);
    let group = find_group(&store, directory, name)?;
    let watcher = match DirectoryWatcher::watch(&group.directory) {
        Ok(w) => Some(w),
        Err(e) => {
            log::warn!("无法监听目录，外部修改不会自动刷新: {}", e);
            None
        }
    };
    let mut session = EditorSession::with_settings(store, group, settings)?;

    println!(
        "正在编辑 {}（{} 行，{} 个文件）。输入 help 查看命令。",
        session.group().name,
        session.table().len(),
        session.group().files.len()
    );

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        if let Some(watcher) = &watcher {
            for event in watcher.drain() {
                log::debug!("外部变更: {:?}", event.paths);
                session.notify_external_change(event.at);
            }
        }
        match session.poll_external_reload(Instant::now()) {
            Ok(true) => println!("文件已在外部修改，已重新加载"),
            Ok(false) => {}
            Err(e) => println!("外部修改后重新加载失败，稍后重试: {}", e),
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        if matches!(command, "quit" | "exit" | "q") {
            break;
        }

        match run_command(&mut session, command, args) {
            Ok(()) => {}
            Err(e) => match e.downcast_ref::<EditError>() {
                Some(edit) if edit.requires_reload() => println!("操作失败，已从磁盘重新加载: {}", edit),
                _ => println!("错误: {}", e),
            },
        }
    }
    Ok(())
}

/// 执行一条编辑命令
fn run_command(session: &mut EditorSession<ResxFileStore>, command: &str, args: &[&str]) -> Result<()> {
    match command {
        "help" => print_help(),
        "list" => print_table(session),
        "set" => {
            let [row, lang, value @ ..] = args else {
                bail!("用法: set <行> <语言> <值>");
            };
            if session.update_cell(parse_index(row)?, lang, &value.join(" "))? {
                println!("已修改");
            } else {
                println!("值未改变");
            }
        }
        "rename" => {
            let [row, new_key] = args else {
                bail!("用法: rename <行> <新键>");
            };
            if session.rename_key(parse_index(row)?, new_key)? {
                println!("已重命名");
            }
        }
        "add" => {
            let [key] = args else {
                bail!("用法: add <键>");
            };
            session.add_key(key)?;
            if let Some(row) = session.take_scroll_target() {
                println!("已添加，位于第 {} 行", row);
            }
        }
        "del" => {
            let [row] = args else {
                bail!("用法: del <行>");
            };
            session.delete_key(parse_index(row)?)?;
            println!("已删除");
        }
        "select" => {
            let [r1, c1, r2, c2] = args else {
                bail!("用法: select <行1> <列1> <行2> <列2>（第 0 列为键列）");
            };
            session.select(
                (parse_index(r1)?, parse_index(c1)?),
                (parse_index(r2)?, parse_index(c2)?),
            );
            match session.selection().range() {
                Some(range) => println!(
                    "已选择 行 {}..={} 列 {}..={}",
                    range.min_row, range.max_row, range.min_col, range.max_col
                ),
                None => println!("选区为空"),
            }
        }
        "bdel" => match session.batch_delete(&ask_confirmation) {
            Ok(0) => println!("选区中没有可操作的内容"),
            Ok(n) => println!("已处理 {} 项", n),
            Err(EditError::Cancelled) => println!("已取消"),
            Err(e) => return Err(e.into()),
        },
        "undo" => {
            let action = session.undo()?;
            println!("已撤销: {}", action);
        }
        "filter" => {
            let blanks_only = session.filter().blanks_only;
            session.set_filter(RowFilter {
                query: args.join(" "),
                blanks_only,
            });
            println!("显示 {} 行", session.displayed_indices().len());
        }
        "blanks" => {
            let mut filter = session.filter().clone();
            filter.blanks_only = !filter.blanks_only;
            session.set_filter(filter);
            println!("显示 {} 行", session.displayed_indices().len());
        }
        "reload" => {
            session.reload()?;
            println!("已重新加载 {} 行", session.table().len());
        }
        "history" => {
            for (i, action) in session.history().iter().enumerate() {
                println!("{:>3}. {}", i + 1, action);
            }
            println!("{}", session.history().summary());
        }
        other => bail!("未知命令: {}（输入 help 查看命令）", other),
    }
    Ok(())
}

fn print_help() {
    println!("命令:");
    println!("  list                         显示表格");
    println!("  set <行> <语言> <值>          修改单元格");
    println!("  rename <行> <新键>            重命名键");
    println!("  add <键>                      新增键");
    println!("  del <行>                      删除键");
    println!("  select <行1> <列1> <行2> <列2> 选择矩形区域（第 0 列为键列）");
    println!("  bdel                         删除所选行/清空所选单元格");
    println!("  undo                         撤销");
    println!("  filter [文本]                 过滤（不带参数时清除）");
    println!("  blanks                       切换只显示有空值的行");
    println!("  reload                       从磁盘重新加载");
    println!("  history                      查看历史");
    println!("  quit                         退出");
}

/// 打印当前显示序列
fn print_table<S: ResourceStore>(session: &EditorSession<S>) {
    let langs = session.group().languages();
    println!("{:>4}  {:<32} {}", "#", "键", langs.join(" | "));
    for (i, row) in session.displayed_rows().iter().enumerate() {
        let values: Vec<&str> = langs.iter().map(|lang| row.display_value(lang)).collect();
        let marker = if (0..=langs.len()).any(|col| session.selection().is_selected(i, col)) {
            "*"
        } else {
            " "
        };
        println!("{:>4}{} {:<32} {}", i, marker, row.key, values.join(" | "));
    }
}

/// 在标准输入上询问确认
fn ask_confirmation(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match std::io::stdin().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}

fn parse_index(text: &str) -> Result<usize> {
    text.parse().map_err(|_| anyhow!("无效的数字: {}", text))
}

fn find_group(store: &ResxFileStore, directory: &Path, name: &str) -> Result<Group> {
    let groups = store
        .scan(directory)
        .with_context(|| format!("扫描目录失败: {:?}", directory))?;
    Ok(select_group(groups, name, directory)?)
}

/// 把资源组加入收藏
fn remember_group(path: Option<&Path>, mut settings: EditorSettings, name: &str, directory: &Path) -> Result<()> {
    let path = path.ok_or_else(|| anyhow!("无法确定设置文件位置"))?;
    let directory = directory.canonicalize().unwrap_or_else(|_| directory.to_path_buf());
    if settings.add_saved_group(name, directory) {
        settings.save(path)?;
        log::info!("已收藏资源组 {}", name);
    }
    Ok(())
}

fn handle_saved(settings: &EditorSettings) {
    if settings.saved_groups.is_empty() {
        println!("没有收藏的资源组");
        return;
    }
    for group in &settings.saved_groups {
        println!("{} ({:?})", group.name, group.directory);
    }
}

fn handle_forget(path: Option<&Path>, mut settings: EditorSettings, name: &str, directory: &Path) -> Result<()> {
    let path = path.ok_or_else(|| anyhow!("无法确定设置文件位置"))?;
    let directory = directory.canonicalize().unwrap_or_else(|_| directory.to_path_buf());
    if settings.remove_saved_group(name, &directory) {
        settings.save(path)?;
        println!("已取消收藏 {}", name);
    } else {
        println!("{} 不在收藏中", name);
    }
    Ok(())
}
