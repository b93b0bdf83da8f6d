use clap::{Parser, Subcommand, ValueEnum};
use doctor_scraper_lib::{contacts, logger, messaging, report};
use doctor_scraper_lib::{
    Config, LookupClient, MessagingClient, RegistrationStatus, RegistryScraper, SearchFilters,
    SessionContext,
};
use log::{info, warn};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

const DEFAULT_TEMPLATE: &str = "Olá {NOME},

Esperamos que esteja bem!
Identificamos seu cadastro em {CIDADE}/{UF}.

Gostaríamos de confirmar seus dados:
Endereço: {FULL-LOGRADOURO}
CEP: {CEP}

Por favor, confirme se estas informações estão corretas.";

#[derive(Parser, Debug)]
#[command(name = "doctor-scraper")]
#[command(about = "Searches the medical-council registry, enriches records, and sends WhatsApp outreach")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the registry and write the results CSV
    Search {
        /// State (UF) to search, e.g. MA
        #[arg(long)]
        uf: String,
        /// Doctor name filter
        #[arg(long)]
        name: Option<String>,
        /// CRM registration number filter
        #[arg(long)]
        crm: Option<String>,
        /// Registration situation
        #[arg(long, value_enum, default_value = "ativo")]
        status: StatusArg,
        /// Specialty, by its visible label on the form
        #[arg(long)]
        specialty: Option<String>,
        /// Area of practice, by its visible label on the form
        #[arg(long = "area")]
        area_of_practice: Option<String>,
        /// Output CSV path
        #[arg(short, long, default_value = "medicos.csv")]
        output: PathBuf,
    },
    /// Enrich a doctors CSV with phone/address lookups
    Enrich {
        /// Doctors CSV produced by `search`
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "medicos_enriquecidos.csv")]
        output: PathBuf,
    },
    /// List messaging-platform operators
    Operators,
    /// List message templates
    Templates,
    /// List WhatsApp integrations
    Integrations,
    /// Bulk-send a templated message to every contact of an enriched CSV
    Send {
        /// Enriched contacts CSV (semicolon-delimited)
        #[arg(long)]
        contacts: PathBuf,
        /// Platform template id (see `templates`)
        #[arg(long, conflicts_with = "template_file")]
        template_id: Option<String>,
        /// File holding a custom message template
        #[arg(long)]
        template_file: Option<PathBuf>,
        /// Sending operator id (see `operators`)
        #[arg(long)]
        operator: Option<String>,
        /// Integration key (see `integrations`)
        #[arg(long)]
        integration: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Ativo,
    Inativo,
}

impl From<StatusArg> for RegistrationStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Ativo => RegistrationStatus::Active,
            StatusArg::Inativo => RegistrationStatus::Inactive,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let mut session = SessionContext::new();

    let result = match cli.command {
        Command::Search {
            uf,
            name,
            crm,
            status,
            specialty,
            area_of_practice,
            output,
        } => run_search(
            &config,
            &mut session,
            SearchFilters {
                name,
                crm,
                state: uf,
                status: status.into(),
                specialty,
                area_of_practice,
            },
            &output,
        ),
        Command::Enrich { input, output } => run_enrich(&config, &input, &output),
        Command::Operators => list_operators(&config),
        Command::Templates => list_templates(&config),
        Command::Integrations => list_integrations(&config),
        Command::Send {
            contacts,
            template_id,
            template_file,
            operator,
            integration,
        } => run_send(
            &config,
            &mut session,
            &contacts,
            template_id.as_deref(),
            template_file.as_deref(),
            operator.as_deref(),
            &integration,
        ),
    };

    session.log_summary();
    result
}

fn run_search(
    config: &Config,
    session: &mut SessionContext,
    filters: SearchFilters,
    output: &PathBuf,
) -> Result<(), Box<dyn Error>> {
    // Precondition check runs before the browser is even launched.
    filters.validate()?;

    let scraper = RegistryScraper::open(&config.registry)?;
    let records = scraper.search(&filters)?;

    session.record_search(filters.summary(), records.len());

    if records.is_empty() {
        warn!("No results for the given filters.");
    }

    report::write_doctor_csv(output, &records)?;
    println!("{} doctors written to {}", records.len(), output.display());
    Ok(())
}

fn run_enrich(
    config: &Config,
    input: &PathBuf,
    output: &PathBuf,
) -> Result<(), Box<dyn Error>> {
    let token = config.lemit_token()?;
    let client = LookupClient::new(&config.lemit.base_url, token);

    let records = report::read_doctor_csv(input)?;
    info!("Enriching {} records from {:?}", records.len(), input);

    let mut rows = Vec::new();
    let mut hits = 0;
    for record in records {
        let details = client.lookup(&record.name);
        if details.is_some() {
            hits += 1;
        } else {
            info!("No contact data found for {}", record.name);
        }
        rows.push((record, details));
    }

    report::write_enriched_csv(output, &rows)?;
    println!(
        "{}/{} records enriched, written to {}",
        hits,
        rows.len(),
        output.display()
    );
    Ok(())
}

fn list_operators(config: &Config) -> Result<(), Box<dyn Error>> {
    let client = tallos_client(config)?;
    let operators = client
        .employees()
        .ok_or("could not fetch operators from the messaging platform")?;
    for op in operators {
        println!("{}  {} ({})", op.id, op.name, op.email);
    }
    Ok(())
}

fn list_templates(config: &Config) -> Result<(), Box<dyn Error>> {
    let client = tallos_client(config)?;
    let templates = client
        .templates()
        .ok_or("could not fetch templates from the messaging platform")?;
    for t in &templates {
        match &t.media_url {
            Some(url) => println!("{}  {} [media: {}]", t.id, t.short_preview, url),
            None => println!("{}  {}", t.id, t.short_preview),
        }
    }
    println!("personalizado  (custom template via --template-file)");
    Ok(())
}

fn list_integrations(config: &Config) -> Result<(), Box<dyn Error>> {
    let client = tallos_client(config)?;
    let integrations = client
        .whatsapp_integrations()
        .ok_or("could not fetch WhatsApp integrations")?;
    for integration in integrations {
        println!("{}  {}", integration.key, integration.label);
    }
    Ok(())
}

fn run_send(
    config: &Config,
    session: &mut SessionContext,
    contacts_path: &PathBuf,
    template_id: Option<&str>,
    template_file: Option<&std::path::Path>,
    operator_id: Option<&str>,
    integration_key: &str,
) -> Result<(), Box<dyn Error>> {
    // Column validation happens before any message is attempted.
    let contacts = contacts::load_contacts(contacts_path)?;
    let client = tallos_client(config)?;

    let template_body = resolve_template(&client, template_id, template_file)?;
    session.set_template(template_body.clone());

    let total = contacts.len();
    let mut success_count = 0;

    for (i, contact) in contacts.iter().enumerate() {
        info!("Processing contact {}/{}: {}", i + 1, total, contact.name);
        if messaging::deliver(&client, contact, &template_body, operator_id, integration_key) {
            success_count += 1;
        }
    }

    session.record_send(total, success_count);
    println!("Envio concluído: {}/{} mensagens enviadas.", success_count, total);
    Ok(())
}

fn resolve_template(
    client: &MessagingClient,
    template_id: Option<&str>,
    template_file: Option<&std::path::Path>,
) -> Result<String, Box<dyn Error>> {
    if let Some(path) = template_file {
        let body = fs::read_to_string(path)?;
        info!("Using custom template from {:?}", path);
        return Ok(body);
    }

    if let Some(id) = template_id {
        let templates = client
            .templates()
            .ok_or("could not fetch templates from the messaging platform")?;
        let template = templates
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("template {} not found", id))?;
        if let Some(url) = &template.media_url {
            info!("Template {} carries media: {}", template.id, url);
        }
        return Ok(template.full_content);
    }

    warn!("No template given, falling back to the built-in default.");
    Ok(DEFAULT_TEMPLATE.to_string())
}

fn tallos_client(config: &Config) -> Result<MessagingClient, Box<dyn Error>> {
    let token = config.tallos_token()?;
    Ok(MessagingClient::new(&config.tallos.base_url, token))
}
