// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Solidkit Contributors

//! Solidkit CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use nalgebra::{Point3, Vector3};
use serde::Serialize;
use solidkit::{
    boolean_operation, heal_model, make_box, validate_model, BooleanOp, BooleanOptions,
    HealOptions, HealingResult, NumericContext, Tolerances, TopologyModel, ValidationReport,
};
use std::path::Path;

#[derive(Parser)]
#[command(name = "solidkit")]
#[command(about = "Solidkit - planar boundary-representation modeling kernel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build two boxes, run a boolean operation, report the result
    Demo {
        /// Operation to run (union, subtract, intersect)
        #[arg(short, long, default_value = "subtract")]
        op: String,

        /// Run the healing pass on the result
        #[arg(long)]
        heal: bool,

        /// Emit the report as JSON instead of a colored summary
        #[arg(long)]
        json: bool,

        /// TOML file with length/angle tolerances
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show version information
    Version,
}

#[derive(Serialize)]
struct DemoReport {
    operation: String,
    faces: usize,
    vertices: usize,
    edges: usize,
    warnings: Vec<String>,
    healing: Option<HealingResult>,
    validation: ValidationReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Demo {
            op,
            heal,
            json,
            config,
        } => demo_command(op, *heal, *json, config.as_deref(), cli.verbose),
        Commands::Version => {
            println!("Solidkit v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_op(op: &str) -> Result<BooleanOp> {
    match op.to_lowercase().as_str() {
        "union" => Ok(BooleanOp::Union),
        "subtract" => Ok(BooleanOp::Subtract),
        "intersect" => Ok(BooleanOp::Intersect),
        other => bail!("unknown operation '{other}' (expected union, subtract, or intersect)"),
    }
}

fn load_context(config: Option<&str>) -> Result<NumericContext> {
    let Some(path) = config else {
        return Ok(NumericContext::default());
    };
    if !Path::new(path).exists() {
        bail!("config file not found: {path}");
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path}"))?;
    let tol: Tolerances =
        toml::from_str(&text).with_context(|| format!("failed to parse config file {path}"))?;
    Ok(NumericContext::new(tol))
}

fn demo_command(
    op: &str,
    heal: bool,
    json: bool,
    config: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let operation = parse_op(op)?;
    let ctx = load_context(config)?;

    let mut model = TopologyModel::with_context(ctx);
    // A 4x4x4 block and a 2x2x2 tool entering half-way from the top
    let block = make_box(&mut model, Point3::origin(), Vector3::new(4.0, 4.0, 4.0));
    let tool = make_box(
        &mut model,
        Point3::new(0.0, 0.0, 1.0),
        Vector3::new(2.0, 2.0, 2.0),
    );

    if verbose {
        println!("Running {operation} of a 4x4x4 block and a 2x2x2 tool");
    }

    let start = std::time::Instant::now();
    let result = boolean_operation(&mut model, block, tool, &BooleanOptions::new(operation));
    let elapsed = start.elapsed();

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            std::process::exit(1);
        }
    };

    let heal_options = HealOptions::for_context(&ctx);
    let healing = heal.then(|| heal_model(&mut model, result.body, &heal_options));
    let validation = validate_model(&model, result.body);

    let report = DemoReport {
        operation: operation.to_string(),
        faces: model.body_faces(result.body).len(),
        vertices: model.body_vertices(result.body).len(),
        edges: model.body_edges(result.body).len(),
        warnings: result.warnings,
        healing,
        validation,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "═".repeat(60).bright_black());
    println!("{}", "Boolean Demo".bold());
    println!("{}", "═".repeat(60).bright_black());
    println!(
        "  {} {}",
        "Operation:".bright_black(),
        report.operation.cyan()
    );
    println!("  {} {:.2?}", "Elapsed:".bright_black(), elapsed);
    println!("  {} {}", "Faces:".bright_black(), report.faces);
    println!("  {} {}", "Vertices:".bright_black(), report.vertices);
    println!("  {} {}", "Edges:".bright_black(), report.edges);

    if !report.warnings.is_empty() {
        println!("\n  {}", "Warnings:".yellow().bold());
        for w in &report.warnings {
            println!("    {}", w.yellow());
        }
    }

    if let Some(h) = &report.healing {
        println!("\n  {}", "Healing:".bold());
        println!(
            "    {} {} merged, {} collapsed, {} removed, {} reoriented",
            format!("{} iteration(s):", h.iterations).bright_black(),
            h.vertices_merged,
            h.edges_collapsed,
            h.faces_removed,
            h.shells_reoriented
        );
    }

    if report.validation.is_valid() {
        println!("\n  {}", "Validation passed".green());
    } else {
        println!("\n  {}", "Validation failed:".red().bold());
        for e in &report.validation.errors {
            println!("    {}", e.red());
        }
    }
    if verbose {
        for w in &report.validation.warnings {
            println!("    {}", w.yellow());
        }
    }
    println!("{}", "═".repeat(60).bright_black());

    if !report.validation.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}
