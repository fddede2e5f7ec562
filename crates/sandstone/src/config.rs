use std::path::PathBuf;

/// Per-invocation compiler configuration: where to read sources, where the
/// template modules live, and where the generated datapack tree is written.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Root directory containing the user's `.py` sources.
    pub source_root: PathBuf,
    /// Root directory probed for template modules after `source_root`.
    pub template_root: PathBuf,
    /// Directory the `.mcfunction` tree is written under.
    pub output_root: PathBuf,
    /// Base namespace prefix for all compiled units, e.g. `source_code:`.
    ///
    /// If it ends with `:` module names are appended directly, otherwise a
    /// `\` separator is inserted.
    pub base_namespace: String,
    /// When set, comment and debug builders emit their instrumentation;
    /// otherwise they produce nothing.
    pub debug: bool,
}

impl CompileConfig {
    pub fn new(
        source_root: impl Into<PathBuf>,
        template_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        base_namespace: impl Into<String>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            template_root: template_root.into(),
            output_root: output_root.into(),
            base_namespace: base_namespace.into(),
            debug: false,
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Engine-level names shared by every compilation: scoreboard objectives,
/// data-storage paths, flag cells and the conventional cell suffixes.
///
/// The defaults match the runtime support pack; renaming any of these only
/// requires the support pack to be regenerated with the same names.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Objective holding marshalled call arguments.
    pub sb_args: String,
    /// Objective holding user variable cells.
    pub sb_vars: String,
    /// Objective holding expression temporaries and result cells.
    pub sb_temp: String,
    /// Objective holding the constant flag cells.
    pub sb_flags: String,
    /// Objective holding per-function return-value cells.
    pub sb_func_result: String,
    /// Objective reserved for host-to-pack input cells.
    pub sb_input: String,

    /// Data storage root, `namespace:path` form.
    pub storage_root: String,
    /// Transient single-value slot used while moving scores to storage.
    pub ds_temp: String,
    /// Stack list for spilled user variables.
    pub ds_local_vars: String,
    /// Stack list for spilled expression temporaries.
    pub ds_local_temp: String,

    /// Flag cell equal to 0; the condition encoding of false.
    pub flag_false: String,
    /// Flag cell equal to 1.
    pub flag_true: String,
    /// Flag cell equal to -1, used for arithmetic negation.
    pub flag_neg: String,
    /// Flag cell holding `10^decimal_precision` for fixed-point templates.
    pub flag_decimal: String,
    /// Number of decimal digits carried by fixed-point template values.
    pub decimal_precision: u32,

    /// Suffix of the per-scope result-temp cell.
    pub result_ext: String,
    /// Namespace functions of the fixed builtin set are invoked under.
    pub builtin_namespace: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            sb_args: "Args".to_owned(),
            sb_vars: "Vars".to_owned(),
            sb_temp: "Temp".to_owned(),
            sb_flags: "Flags".to_owned(),
            sb_func_result: "FuncResult".to_owned(),
            sb_input: "Input".to_owned(),
            storage_root: "sandstone:runtime".to_owned(),
            ds_temp: "Temp".to_owned(),
            ds_local_vars: "LocalVars".to_owned(),
            ds_local_temp: "LocalTemp".to_owned(),
            flag_false: "FALSE".to_owned(),
            flag_true: "TRUE".to_owned(),
            flag_neg: "NEG".to_owned(),
            flag_decimal: "DECIMAL".to_owned(),
            decimal_precision: 3,
            result_ext: ".?Result".to_owned(),
            builtin_namespace: "python:built-in".to_owned(),
        }
    }
}

impl GlobalConfig {
    /// All objectives the generated code touches, in creation order.
    pub fn objectives(&self) -> [&str; 6] {
        [
            &self.sb_args,
            &self.sb_vars,
            &self.sb_temp,
            &self.sb_flags,
            &self.sb_func_result,
            &self.sb_input,
        ]
    }

    /// The value of the decimal-precision flag cell.
    pub fn decimal_flag_value(&self) -> i32 {
        10i32.pow(self.decimal_precision)
    }
}
