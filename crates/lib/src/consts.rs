/// Number of hex characters kept from a SHA-256 digest for object hashes.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// Language version tag that switches compiles from boot classpath to system modules.
pub const SYSTEM_MODULES_JAVA_VERSION: &str = "1.9";

/// Language version used when a module does not set one.
pub const DEFAULT_JAVA_VERSION: &str = "1.8";

/// Separator used when joining classpath entries into one argument.
pub const CLASSPATH_SEPARATOR: &str = ":";

/// Trailing path component of a system module image, stripped to get the module root.
pub const SYSTEM_MODULES_SUFFIX: &str = "lib/modules";

/// Module output subdirectory for compiled classes.
pub const CLASSES_DIR: &str = "classes";

/// Module output subdirectory for annotation processor output.
pub const ANNO_DIR: &str = "anno";

/// Module output subdirectory for per-class dex output.
pub const DEX_DIR: &str = "dex";

/// Module output subdirectory for lambda proxy classes dumped during desugaring.
pub const DESUGAR_DUMP_DIR: &str = "desugar_dumped_classes";

/// Intermediates suffix used for the error prone compile.
pub const ERROR_PRONE_SUFFIX: &str = "-errorprone";

/// JVM flag needed to run desugar on OpenJDK 9 and later.
pub const OPENJDK9_DESUGAR_FLAGS: &str = "--add-opens java.base/java.lang.invoke=ALL-UNNAMED";

/// Environment variable naming the toolchain config file.
pub const TOOLCHAIN_ENV: &str = "DEXRULE_TOOLCHAIN";
