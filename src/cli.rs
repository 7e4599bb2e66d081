use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Generates a BibTeX file for a given ORCID id.",
    long_about = None
)]
pub struct Cli {
    /// The ORCID ID for the individual whose works should be recorded.
    #[arg(value_name = "0000-0000-0000-0000")]
    pub orcid: String,

    /// The destination for the output BibTeX file.
    #[arg(short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Where the bibliography ends up: `-o` if given, otherwise `<ORCID>.bib` in the working
    /// directory.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.bib", self.orcid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn output_defaults_to_orcid_named_file() {
        proptest::proptest!(|(id in "[0-9]{4}-[0-9]{4}-[0-9]{4}-[0-9]{3}[0-9X]")| {
            let cli = Cli::try_parse_from(["orcid-bib", id.as_str()]).expect("parse");
            proptest::prop_assert_eq!(cli.output_path(), PathBuf::from(format!("{id}.bib")));
        })
    }

    #[test]
    fn output_flag_overrides_default() {
        let cli = Cli::try_parse_from(["orcid-bib", "0000-0002-1543-0148", "-o", "out/refs.bib"])
            .expect("parse");
        assert_eq!(cli.orcid, "0000-0002-1543-0148");
        assert_eq!(cli.output_path(), PathBuf::from("out/refs.bib"));
    }

    #[test]
    fn orcid_is_required() {
        assert!(Cli::try_parse_from(["orcid-bib"]).is_err());
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let args = ["orcid-bib", "0000-0002-1543-0148", "--indent", "2"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
