//! CLI for translating a JSON predicate into a PostgreSQL SELECT.
//!
//! Pass the JSON predicate via STDIN or as a command line parameter and
//! this tool prints the compiled SQL followed by its bind arguments.
//!
//! % predsql-compile --record-type note --user alice \
//!     '["eq", {"$type":"keypath","$val":"title"}, "hello"]'
use predsql::conf::{Config, PlaceholderFormat};
use predsql::parse::{parse_predicate, parse_sorts};
use predsql::query::{AclLevel, UserInfo};
use predsql::schema::RecordSchema;
use predsql::select::Pager;
use predsql::{PqError, PqResult, SelectQuery};
use std::env;
use std::io;
use std::io::IsTerminal;

const HELP_TEXT: &str = r#"

Synopsis

    predsql-compile --record-type note --user alice --role admin \
        '["eq", {"$type":"keypath","$val":"title"}, "hello"]'

    echo '["gt", {"$type":"keypath","$val":"score"}, 3]' | \
        predsql-compile --record-type note --dollar

Options

    --record-type <type>
        Record type (table) being queried.  Defaults to "note".

    --user <id>
        Restrict results to records visible to this user.  Relation
        predicates also target this user.

    --role <role>
        Role held by the user.  Repeatable.

    --write
        Check write access instead of read access.

    --sort <json>
        JSON list of [expression, "asc"|"desc"] pairs.

    --limit <count>
    --offset <count>
        Page through results.  --offset requires --limit.

    --count
        Also select the total number of matching records.

    --config <path>
        YAML configuration file.

    --dollar
        Use numbered $1, $2, ... placeholders.

    -v, --verbose
        Log compilation details.  Repeat for more.

    -h, --help
        Show this message.

"#;

fn read_options() -> PqResult<Option<getopts::Matches>> {
    let args: Vec<String> = env::args().collect();
    let mut opts = getopts::Options::new();

    opts.optopt("", "record-type", "", "");
    opts.optopt("", "user", "", "");
    opts.optopt("", "sort", "", "");
    opts.optopt("", "limit", "", "");
    opts.optopt("", "offset", "", "");
    opts.optopt("", "config", "", "");

    opts.optmulti("", "role", "", "");

    opts.optflag("", "write", "");
    opts.optflag("", "count", "");
    opts.optflag("", "dollar", "");
    opts.optflagmulti("v", "verbose", "");
    opts.optflag("h", "help", "");

    let params = opts
        .parse(&args[1..])
        .map_err(|e| format!("Error parsing options: {e}"))?;

    if params.opt_present("help") {
        println!("{HELP_TEXT}");
        return Ok(None);
    }

    Ok(Some(params))
}

fn setup_logging(config: &Config, verbosity: usize) {
    let level = match verbosity {
        0 => config.log_level(),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new().filter_level(level).init();
}

/// Predicate JSON from the free command line arguments, or STDIN when
/// none were given.
fn read_predicate_text(params: &getopts::Matches) -> PqResult<Option<String>> {
    if !params.free.is_empty() {
        return Ok(Some(params.free.join(" ")));
    }

    let stdin = io::stdin();

    if stdin.is_terminal() {
        // Avoid blocking on STDIN in interactive mode.
        return Ok(None);
    }

    let mut buffer = String::new();
    let mut lines = String::new();

    while stdin.read_line(&mut buffer).map_err(|e| e.to_string())? > 0 {
        lines += &buffer;
        buffer.clear();
    }

    if lines.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(lines))
}

fn parse_count(params: &getopts::Matches, name: &str) -> PqResult<Option<usize>> {
    match params.opt_str(name) {
        Some(v) => v
            .parse::<usize>()
            .map(Some)
            .map_err(|e| PqError::from(format!("Invalid --{name} value {v}: {e}"))),
        None => Ok(None),
    }
}

fn main() -> PqResult<()> {
    let params = match read_options()? {
        Some(p) => p,
        None => return Ok(()),
    };

    let mut config = Config::new();

    if let Some(path) = params.opt_str("config") {
        config.read_yaml(&path)?;
    }

    if params.opt_present("dollar") {
        config.set_placeholder(PlaceholderFormat::Dollar);
    }

    setup_logging(&config, params.opt_count("verbose"));

    let roles = params.opt_strs("role");
    let roles: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
    let user = UserInfo::new(&params.opt_str("user").unwrap_or_default(), &roles);

    let record_type = params
        .opt_str("record-type")
        .unwrap_or_else(|| "note".to_string());

    let mut query = SelectQuery::new(&record_type);

    if let Some(text) = read_predicate_text(&params)? {
        let json = json::parse(text.trim()).map_err(|e| format!("Invalid predicate JSON: {e}"))?;
        query.set_predicate(parse_predicate(&json, &user)?);
    }

    if let Some(text) = params.opt_str("sort") {
        let json = json::parse(&text).map_err(|e| format!("Invalid sort JSON: {e}"))?;
        query.set_sorts(parse_sorts(&json)?);
    }

    match (parse_count(&params, "limit")?, parse_count(&params, "offset")?) {
        (Some(limit), offset) => query.set_pager(Pager::new(limit, offset.unwrap_or(0))),
        (None, Some(_)) => return Err("--offset requires --limit".into()),
        (None, None) => {}
    }

    if params.opt_present("count") {
        query.set_overall_count(true);
    }

    if !user.is_anonymous() {
        let level = if params.opt_present("write") {
            AclLevel::Write
        } else {
            AclLevel::Read
        };
        query.set_access(user, level);
    }

    let stmt = query.compile(&config, RecordSchema::new())?;

    let args: Vec<json::JsonValue> = stmt.args.iter().map(|a| a.to_json_value()).collect();

    println!("{};", stmt.sql);
    println!("{}", json::JsonValue::Array(args).dump());

    Ok(())
}
