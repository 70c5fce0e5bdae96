use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use vial_core::*;

#[derive(Parser)]
#[command(name = "vialog")]
#[command(about = "Vial inventory and dose tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a reconstituted vial
    Add {
        /// Compound name
        #[arg(long)]
        name: String,

        /// Mass loaded into the vial, in mg
        #[arg(long)]
        total_mg: f64,

        /// Diluent added, in mL
        #[arg(long)]
        water_ml: f64,
    },

    /// List vials (default)
    List,

    /// Work out how much to draw without logging anything
    Calc {
        /// Vial id, id prefix or name
        vial: String,

        #[command(flatten)]
        amount: AmountArgs,
    },

    /// Log a dose and draw it from the vial
    Dose {
        /// Vial id, id prefix or name
        vial: String,

        #[command(flatten)]
        amount: AmountArgs,
    },

    /// Show dose history
    Logs {
        /// Only show doses from this vial
        #[arg(long)]
        vial: Option<String>,
    },

    /// Delete a dose log and return the dose to its vial
    RemoveLog {
        /// Log id or id prefix
        log: String,
    },

    /// Delete a vial (its dose history is kept)
    RemoveVial {
        /// Vial id, id prefix or name
        vial: String,

        /// Don't ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Show how a vial has been drawn down
    Usage {
        /// Vial id, id prefix or name
        vial: String,
    },
}

#[derive(Args)]
struct AmountArgs {
    /// Desired dose as a mass
    #[arg(long, required_unless_present = "units", conflicts_with = "units")]
    dose: Option<f64>,

    /// Unit for --dose (mg or mcg)
    #[arg(long, requires = "dose")]
    unit: Option<MassUnit>,

    /// Syringe reading in U-100 units
    #[arg(long)]
    units: Option<f64>,
}

impl AmountArgs {
    fn to_input(&self, config: &Config) -> DoseInput {
        match (self.dose, self.units) {
            (Some(amount), _) => DoseInput::Mass {
                amount,
                unit: self.unit.unwrap_or(config.dosing.default_unit),
            },
            (None, Some(units)) => DoseInput::Units(units),
            // clap enforces exactly one of the two
            (None, None) => DoseInput::Units(0.0),
        }
    }
}

fn main() -> Result<()> {
    vial_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let store = LedgerStore::in_dir(&data_dir);

    match cli.command.unwrap_or(Commands::List) {
        Commands::Add {
            name,
            total_mg,
            water_ml,
        } => cmd_add(&store, &name, total_mg, water_ml),
        Commands::List => cmd_list(&store, &config),
        Commands::Calc { vial, amount } => cmd_calc(&store, &vial, amount.to_input(&config)),
        Commands::Dose { vial, amount } => cmd_dose(&store, &vial, amount.to_input(&config)),
        Commands::Logs { vial } => cmd_logs(&store, vial.as_deref()),
        Commands::RemoveLog { log } => cmd_remove_log(&store, &log),
        Commands::RemoveVial { vial, yes } => cmd_remove_vial(&store, &vial, yes),
        Commands::Usage { vial } => cmd_usage(&store, &vial, &config),
    }
}

/// Run a mutation as one store transaction and print what changed
fn mutate<T, F>(store: &LedgerStore, f: F) -> Result<T>
where
    F: FnOnce(&mut Ledger) -> Result<T>,
{
    let (tx, rx) = channel::<LedgerEvent>();
    let value = store.update(|ledger| {
        ledger.subscribe(Box::new(tx));
        f(ledger)
    })?;
    report(rx);
    Ok(value)
}

fn report(events: Receiver<LedgerEvent>) {
    for event in events.try_iter() {
        match event {
            LedgerEvent::VialCreated(vial) => {
                println!("✓ Added vial {} [{}]", vial.name, short_id(&vial.id));
                println!(
                    "  {} mg in {} mL = {} mg/mL",
                    vial.total_mg, vial.water_ml, vial.concentration
                );
            }
            LedgerEvent::VialRemoved(vial) => {
                println!("✓ Removed vial {} [{}]", vial.name, short_id(&vial.id));
            }
            LedgerEvent::DoseLogged { log, remaining_mg } => {
                println!(
                    "✓ Logged {:.3} mg ({:.1} units) of {} [{}]",
                    log.dose_mg,
                    log.units_used,
                    log.peptide_name,
                    short_id(&log.id)
                );
                println!("  {:.2} mg left", remaining_mg);
            }
            LedgerEvent::LogRemoved { log, restored_to } => {
                println!(
                    "✓ Removed log of {:.3} mg {} [{}]",
                    log.dose_mg,
                    log.peptide_name,
                    short_id(&log.id)
                );
                match restored_to {
                    Some(remaining) => println!("  Restored to vial, {:.2} mg left", remaining),
                    None => println!("  Vial no longer exists, nothing restored"),
                }
            }
        }
    }
}

fn cmd_add(store: &LedgerStore, name: &str, total_mg: f64, water_ml: f64) -> Result<()> {
    let new = validate_new_vial(name, total_mg, water_ml)?;
    mutate(store, |ledger| {
        Ok(ledger.create_vial(new.name, new.total_mg, new.water_ml))
    })?;
    Ok(())
}

fn cmd_list(store: &LedgerStore, config: &Config) -> Result<()> {
    let ledger = store.load()?;
    if ledger.vials().is_empty() {
        println!("No vials yet. Add one with `vialog add`.");
        return Ok(());
    }

    let thresholds = config.stock.thresholds();
    println!(
        "{:<8}  {:<20}  {:>12}  {:>17}  {:>5}  {:<6}  ADDED",
        "ID", "NAME", "CONC", "REMAINING", "LEFT", "STOCK"
    );
    for vial in ledger.vials() {
        println!(
            "{:<8}  {:<20}  {:>7.3} mg/mL  {:>8.2} / {:<5} mg  {:>4.0}%  {:<6}  {}",
            short_id(&vial.id),
            vial.name,
            vial.concentration,
            vial.remaining_mg,
            vial.total_mg,
            vial.percent_remaining(),
            vial.stock_level(&thresholds).to_string(),
            vial.date_added.format("%Y-%m-%d")
        );
    }
    Ok(())
}

fn cmd_calc(store: &LedgerStore, vial: &str, input: DoseInput) -> Result<()> {
    let ledger = store.load()?;
    let vial = find_vial(&ledger, vial)?;
    let quote = quote(vial, input);

    println!("{} • {} mg/mL • {:.2} mg left", vial.name, vial.concentration, vial.remaining_mg);
    match input {
        DoseInput::Mass { .. } => {
            println!("  Draw exactly {:.1} units (= {:.3} mL)", quote.units, quote.ml);
        }
        DoseInput::Units(_) => {
            println!("  Contains {:.0} mcg (= {:.3} mg)", quote.mcg, quote.mg);
        }
    }
    if quote.exceeds_remaining {
        println!("  Not enough in vial ({:.2} mg left)", vial.remaining_mg);
    }
    Ok(())
}

fn cmd_dose(store: &LedgerStore, vial: &str, input: DoseInput) -> Result<()> {
    mutate(store, |ledger| {
        let vial = find_vial(ledger, vial)?.clone();
        let quote = quote(&vial, input);
        validate_dose(&vial, &quote)?;
        Ok(ledger.log_dose(&vial.id, quote.mg, quote.units))
    })?;
    Ok(())
}

fn cmd_logs(store: &LedgerStore, vial: Option<&str>) -> Result<()> {
    let ledger = store.load()?;
    let logs: Vec<&DoseLog> = match vial {
        Some(query) => {
            let vial = find_vial(&ledger, query)?;
            ledger.logs_for_vial(&vial.id)
        }
        None => ledger.logs().iter().collect(),
    };

    if logs.is_empty() {
        println!("No doses logged.");
        return Ok(());
    }

    println!(
        "{:<8}  {:<16}  {:<20}  {:>10}  {:>8}",
        "ID", "DATE", "NAME", "DOSE", "UNITS"
    );
    for log in logs {
        println!(
            "{:<8}  {:<16}  {:<20}  {:>7.3} mg  {:>8.1}",
            short_id(&log.id),
            log.date.format("%Y-%m-%d %H:%M"),
            log.peptide_name,
            log.dose_mg,
            log.units_used
        );
    }
    Ok(())
}

fn cmd_remove_log(store: &LedgerStore, log: &str) -> Result<()> {
    mutate(store, |ledger| {
        let id = resolve_id(
            ledger.logs().iter().map(|l| (&l.id, l.peptide_name.as_str())),
            log,
            "log",
            false,
        )?;
        Ok(ledger.remove_log(&id))
    })?;
    Ok(())
}

fn cmd_remove_vial(store: &LedgerStore, vial: &str, yes: bool) -> Result<()> {
    let ledger = store.load()?;
    let target = find_vial(&ledger, vial)?;

    if !yes && !confirm(&format!(
        "Delete vial {} ({:.2} mg left)? Dose history is kept.",
        target.name, target.remaining_mg
    ))? {
        println!("Cancelled.");
        return Ok(());
    }

    let id = target.id.clone();
    mutate(store, |ledger| Ok(ledger.remove_vial(&id)))?;
    Ok(())
}

fn cmd_usage(store: &LedgerStore, vial: &str, config: &Config) -> Result<()> {
    let ledger = store.load()?;
    let vial = find_vial(&ledger, vial)?;
    let summary = usage_summary(vial, ledger.logs(), &config.stock.thresholds());

    println!("{} [{}]", vial.name, short_id(&vial.id));
    for point in depletion_series(vial, ledger.logs()) {
        println!(
            "  {}  {:>8.2} mg",
            point.at.format("%Y-%m-%d %H:%M"),
            point.remaining_mg
        );
    }
    println!();
    println!("  Used:   {:.2} mg", summary.used_mg);
    println!("  Doses:  {}", summary.dose_count);
    println!(
        "  Left:   {:.0}% ({})",
        summary.percent_remaining, summary.level
    );
    Ok(())
}

fn find_vial<'a>(ledger: &'a Ledger, query: &str) -> Result<&'a Vial> {
    let id = resolve_id(
        ledger.vials().iter().map(|v| (&v.id, v.name.as_str())),
        query,
        "vial",
        true,
    )?;
    ledger
        .get_vial(&id)
        .ok_or_else(|| Error::Other(format!("No vial matches '{}'", query)))
}

/// Resolve a user-supplied id, id prefix or (optionally) name to one id.
///
/// A full id wins over an exact name, and an exact name wins over id
/// prefixes, so a vial called "abc" stays reachable even when another
/// vial's id happens to start with "abc".
fn resolve_id<'a>(
    candidates: impl Iterator<Item = (&'a Id, &'a str)>,
    query: &str,
    kind: &str,
    match_name: bool,
) -> Result<Id> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(Error::Validation(format!("{} id must not be empty", kind)));
    }

    // (id, lowercased id, lowercased name)
    let candidates: Vec<(&Id, String, String)> = candidates
        .map(|(id, name)| (id, id.as_str().to_lowercase(), name.to_lowercase()))
        .collect();

    let exact: Vec<&Id> = candidates
        .iter()
        .filter(|(_, id, _)| *id == needle)
        .map(|(id, _, _)| *id)
        .collect();
    let named: Vec<&Id> = candidates
        .iter()
        .filter(|(_, _, name)| match_name && *name == needle)
        .map(|(id, _, _)| *id)
        .collect();
    let prefixed: Vec<&Id> = candidates
        .iter()
        .filter(|(_, id, _)| id.starts_with(&needle))
        .map(|(id, _, _)| *id)
        .collect();

    let matches = [exact, named, prefixed]
        .into_iter()
        .find(|m| !m.is_empty())
        .unwrap_or_default();

    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => Err(Error::Other(format!("No {} matches '{}'", kind, query))),
        _ => Err(Error::Other(format!(
            "'{}' matches {} {}s, use a longer id",
            query,
            matches.len(),
            kind
        ))),
    }
}

fn short_id(id: &Id) -> String {
    id.as_str().chars().take(8).collect()
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
