use clap::Parser;
use snafu::ResultExt;
use std::io::{self, Read, Write};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

/// Maximum username length accepted by Apache htpasswd.
const MAX_USERNAME_LEN: usize = 255;

/// Maximum password length accepted by Apache htpasswd.
const MAX_PASSWORD_LEN: usize = 255;

/// Produce and check Apache `$apr1$` (APR1-MD5) password hashes.
#[derive(Parser)]
#[command(name = "apr1")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Hash a password and print the result
    Hash {
        /// Print `username:hash`, ready to append to an htpasswd file
        username: Option<String>,
        /// Password on the command line (like `htpasswd -b`); visible to other users
        #[arg(value_name = "PASSWORD", requires = "username", conflicts_with = "password")]
        batch_password: Option<String>,
        /// Salt to use instead of a random one (truncated to 8 characters)
        #[arg(long)]
        salt: Option<String>,
        /// Read password from stdin instead of prompting
        #[arg(long)]
        password: bool,
        /// Reject passwords that are not valid UTF-8
        #[arg(long)]
        utf8: bool,
    },

    /// Verify a password against an `$apr1$` hash
    Verify {
        /// The stored hash, e.g. `$apr1$ZIOpPHmv$w.iQ7YJbtKjs/I5iTlVcl/`
        hash: String,
        /// Password on the command line (like `htpasswd -b`); visible to other users
        #[arg(value_name = "PASSWORD", conflicts_with = "password")]
        batch_password: Option<String>,
        /// Read password from stdin instead of prompting
        #[arg(long)]
        password: bool,
    },

    /// Print a freshly generated salt
    Salt,
}

type Result<T> = ::std::result::Result<T, snafu::Whatever>;

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "apr1=debug,warn",
        _ => "apr1=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn check_password(password: Zeroizing<Vec<u8>>) -> Result<Zeroizing<Vec<u8>>> {
    snafu::ensure_whatever!(
        password.len() <= MAX_PASSWORD_LEN,
        "Password must be at most {} bytes",
        MAX_PASSWORD_LEN
    );
    Ok(password)
}

fn read_password_from_stdin() -> Result<Zeroizing<Vec<u8>>> {
    // Allocated once: room for the password, a CRLF and one byte of overflow.
    let mut password = Zeroizing::new(vec![0u8; MAX_PASSWORD_LEN + 3]);
    let mut stdin = io::stdin().lock();
    let mut len = 0;

    while len < password.len() {
        match stdin.read(&mut password[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).whatever_context("Can't read password from stdin"),
        }
    }

    let trimmed = password[..len].trim_ascii_end().len();
    password.truncate(trimmed);
    check_password(password)
}

fn prompt_password() -> Result<Zeroizing<Vec<u8>>> {
    let password = rpassword::prompt_password("Enter password: ")
        .whatever_context("Can't prompt for password")?;
    check_password(Zeroizing::new(password.into_bytes()))
}

/// Takes ownership of a password given on the command line.
fn batch_password(password: String) -> Result<Zeroizing<Vec<u8>>> {
    check_password(Zeroizing::new(password.into_bytes()))
}

fn prompt_password_confirm() -> Result<Zeroizing<Vec<u8>>> {
    loop {
        let mut password = Zeroizing::new(
            rpassword::prompt_password("New password: ")
                .whatever_context("Can't prompt for new password")?,
        );
        let confirm = Zeroizing::new(
            rpassword::prompt_password("Re-type new password: ")
                .whatever_context("Can't prompt for password re-type")?,
        );

        if apr1::compare_hashes(password.as_bytes(), confirm.as_bytes()) {
            let password = std::mem::take(&mut *password).into_bytes();
            return check_password(Zeroizing::new(password));
        }

        eprintln!("Password verification error: Passwords do not match");
        eprint!("Try again? [Y/n]: ");
        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .whatever_context("Can't read line")?;
        let response = response.trim().to_lowercase();

        snafu::ensure_whatever!(
            response != "n" && response != "no",
            "Password confirmation failed"
        );
    }
}

fn check_username(username: &str) -> Result<()> {
    snafu::ensure_whatever!(!username.is_empty(), "Username cannot be empty");
    snafu::ensure_whatever!(
        username.len() <= MAX_USERNAME_LEN,
        "Username must be at most {} bytes",
        MAX_USERNAME_LEN
    );
    snafu::ensure_whatever!(
        !username.contains(':'),
        "Username '{}' contains invalid character ':'",
        username
    );
    Ok(())
}

/// Truncates a user supplied salt to 8 characters and checks its alphabet.
fn prepare_salt(salt: &str) -> Result<&[u8]> {
    let salt = &salt.as_bytes()[..salt.len().min(apr1::SALT_LEN)];
    snafu::ensure_whatever!(!salt.is_empty(), "Salt cannot be empty");
    let bad = salt.iter().find(|&&b| !apr1::is_itoa64(b));
    snafu::ensure_whatever!(
        bad.is_none(),
        "Salt contains invalid character {:?}; allowed are ./0-9A-Za-z",
        bad.map(|&b| b as char).unwrap_or_default()
    );
    Ok(salt)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Hash {
            username,
            batch_password: from_args,
            salt,
            password: from_stdin,
            utf8,
        } => {
            if let Some(username) = &username {
                check_username(username)?;
            }
            let salt = match &salt {
                Some(salt) => prepare_salt(salt)?,
                None => &[][..],
            };

            let password = match from_args {
                Some(password) => batch_password(password)?,
                None if from_stdin => read_password_from_stdin()?,
                None => prompt_password_confirm()?,
            };

            tracing::debug!(random_salt = salt.is_empty(), utf8, "hashing password");
            let hash = if utf8 {
                apr1::hash_password_utf8(&password, salt)
            } else {
                apr1::hash_password(&password, salt)
            }
            .whatever_context("Can't hash password")?;

            let mut line = Vec::new();
            if let Some(username) = username {
                line.extend(username.into_bytes());
                line.push(b':');
            }
            line.extend(hash.into_bytes());
            line.push(b'\n');
            io::stdout()
                .write_all(&line)
                .whatever_context("Can't write hash to stdout")?;
            Ok(())
        }

        Commands::Verify {
            hash,
            batch_password: from_args,
            password: from_stdin,
        } => {
            let password = match from_args {
                Some(password) => batch_password(password)?,
                None if from_stdin => read_password_from_stdin()?,
                None => prompt_password()?,
            };

            let matches = apr1::verify_password(&password, hash.trim().as_bytes())
                .whatever_context("Can't verify password")?;
            tracing::debug!(matches, "verified password");
            snafu::ensure_whatever!(matches, "password incorrect");
            println!("password correct");
            Ok(())
        }

        Commands::Salt => {
            let salt = apr1::generate_salt().whatever_context("Can't generate salt")?;
            let salt =
                std::str::from_utf8(&salt).whatever_context("Generated salt is not valid UTF-8")?;
            println!("{}", salt);
            Ok(())
        }
    }
}

#[snafu::report]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
