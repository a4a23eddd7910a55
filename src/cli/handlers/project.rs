use crate::cli::commands::*;
use crate::cli::output::*;
use crate::model::app_data::{AppData, ProjectStatusFilter};
use crate::ops::project_ops::{self, ProjectFiltersUpdate, ProjectUpdate};
use crate::ops::task_ops::TaskError;

use super::{CmdResult, Context, print_json};

pub fn cmd_project(args: ProjectCmd, ctx: &Context) -> CmdResult {
    match args.action {
        None => cmd_project_list(ProjectListArgs::default(), ctx),
        Some(ProjectAction::List(a)) => cmd_project_list(a, ctx),
        Some(ProjectAction::Add(a)) => cmd_project_add(a, ctx),
        Some(ProjectAction::Rm(a)) => cmd_project_rm(a, ctx),
        Some(ProjectAction::Use(a)) => cmd_project_use(a, ctx),
        Some(ProjectAction::Edit(a)) => cmd_project_edit(a, ctx),
        Some(ProjectAction::Tag(a)) => cmd_project_tag(a, ctx),
        Some(ProjectAction::Vocab(a)) => cmd_project_vocab(a, ctx),
    }
}

/// Exact id, then case-insensitive name, then unique id prefix.
fn resolve_project_id(data: &AppData, query: &str) -> CmdResult<String> {
    if query.is_empty() {
        return Err(TaskError::ProjectNotFound(query.to_string()).into());
    }
    if let Some(p) = data.project(query) {
        return Ok(p.id.clone());
    }
    let by_name: Vec<&str> = data
        .projects
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(query))
        .map(|p| p.id.as_str())
        .collect();
    if let [id] = by_name.as_slice() {
        return Ok(id.to_string());
    }
    let hits: Vec<&str> = data
        .projects
        .iter()
        .filter(|p| p.id.starts_with(query))
        .map(|p| p.id.as_str())
        .collect();
    match hits.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(TaskError::ProjectNotFound(query.to_string()).into()),
        _ => Err(format!("ambiguous project id '{}' matches {}", query, hits.join(", ")).into()),
    }
}

fn cmd_project_list(args: ProjectListArgs, ctx: &Context) -> CmdResult {
    let status = match args.status.as_deref() {
        Some(s) => Some(ProjectStatusFilter::parse_filter(s).ok_or_else(|| {
            format!("unknown project status '{}' (expected: all, active, completed)", s)
        })?),
        None => None,
    };
    let ad_hoc = args.search.is_some() || !args.tag.is_empty() || status.is_some();
    let update = ProjectFiltersUpdate {
        search: args.search,
        tags: (!args.tag.is_empty()).then_some(args.tag),
        status,
    };

    let data = if args.clear || args.save {
        ctx.write(|ws| {
            if args.clear {
                ws.clear_project_filters();
            }
            if args.save {
                ws.update_project_filters(update.clone());
            }
            Ok(ws.data().clone())
        })?
    } else {
        ctx.open().data().clone()
    };

    let mut filters = data.project_filters.clone();
    if ad_hoc && !args.save {
        project_ops::update_project_filters(&mut filters, update);
    }
    let projects = project_ops::filtered_projects(&data.projects, &filters);
    let current = data.current_project_id.as_deref();

    if ctx.json {
        let items: Vec<ProjectJson> = projects
            .iter()
            .map(|p| project_to_json(p, Some(p.id.as_str()) == current))
            .collect();
        return print_json(&items);
    }

    if data.projects.is_empty() {
        println!("No projects yet.");
        println!();
        println!("Run `arbor project add <name>` to create one.");
        return Ok(());
    }
    for p in projects {
        println!("{}", format_project_row(p, Some(p.id.as_str()) == current));
    }
    let all_tags = project_ops::all_project_tags(&data.projects);
    if !all_tags.is_empty() {
        println!();
        println!("tags: {}", all_tags.join(", "));
    }
    Ok(())
}

fn cmd_project_add(args: ProjectAddArgs, ctx: &Context) -> CmdResult {
    let name = args.name.trim().to_string();
    if name.is_empty() {
        return Err("project name cannot be empty".into());
    }
    let id = ctx.write(|ws| Ok(ws.add_project(&name, args.description, args.color, args.tag)))?;
    println!("{}", id);
    Ok(())
}

fn cmd_project_rm(args: ProjectIdArg, ctx: &Context) -> CmdResult {
    let name = ctx.write(|ws| {
        let id = resolve_project_id(ws.data(), &args.id)?;
        let name = ws
            .data()
            .project(&id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        ws.delete_project(&id);
        Ok(name)
    })?;
    println!("deleted project {}", name);
    Ok(())
}

fn cmd_project_use(args: ProjectIdArg, ctx: &Context) -> CmdResult {
    let name = ctx.write(|ws| {
        let id = resolve_project_id(ws.data(), &args.id)?;
        ws.set_current_project(&id)?;
        Ok(ws.current_project().map(|p| p.name.clone()).unwrap_or_default())
    })?;
    println!("now on {}", name);
    Ok(())
}

fn cmd_project_edit(args: ProjectEditArgs, ctx: &Context) -> CmdResult {
    if args.name.is_none() && args.description.is_none() && args.color.is_none() {
        return Err("nothing to change (use --name, --description or --color)".into());
    }
    if let Some(name) = &args.name
        && name.trim().is_empty()
    {
        return Err("project name cannot be empty".into());
    }
    let id = ctx.write(|ws| {
        let id = resolve_project_id(ws.data(), &args.id)?;
        ws.update_project(
            &id,
            ProjectUpdate {
                name: args.name.map(|n| n.trim().to_string()),
                description: args.description,
                color: args.color,
            },
        );
        Ok(id)
    })?;
    println!("{} updated", short_id(&id));
    Ok(())
}

fn cmd_project_tag(args: ProjectTagArgs, ctx: &Context) -> CmdResult {
    let changed = ctx.write(|ws| {
        let id = resolve_project_id(ws.data(), &args.id)?;
        let changed = match args.action.as_str() {
            "add" => ws.add_project_tag(&id, &args.tag)?,
            "rm" => ws.remove_project_tag(&id, &args.tag)?,
            other => return Err(format!("unknown action '{}' (expected: add, rm)", other).into()),
        };
        Ok(changed)
    })?;
    match (changed, args.action.as_str()) {
        (true, _) => println!("{} tag {} {}", args.id, args.action, args.tag),
        (false, "add") => println!("{} already tagged {}", args.id, args.tag),
        (false, _) => println!("{} not tagged {}", args.id, args.tag),
    }
    Ok(())
}

fn cmd_project_vocab(args: VocabArgs, ctx: &Context) -> CmdResult {
    let Some(action) = args.action else {
        let ws = ctx.open();
        let project = ws.current_project().ok_or(TaskError::NoCurrentProject)?;
        if ctx.json {
            return print_json(&project.available_tags);
        }
        for tag in &project.available_tags {
            println!("{}", tag);
        }
        return Ok(());
    };
    let tag = args
        .tag
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or("missing tag name")?;

    ctx.write(|ws| {
        match action.as_str() {
            "add" => {
                ws.add_available_tag(&tag)?;
            }
            "rm" => ws.remove_available_tag(&tag)?,
            other => return Err(format!("unknown action '{}' (expected: add, rm)", other).into()),
        }
        Ok(())
    })?;
    println!("vocab {} {}", action, tag);
    Ok(())
}
