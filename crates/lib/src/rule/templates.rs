//! The canonical rule templates, one per [`Stage`].

use super::types::{Param, Stage};

/// Static description of a rule before toolchain values are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTemplate {
  pub stage: Stage,
  pub command: &'static str,
  pub params: &'static [Param],
  pub rspfile: bool,
  /// Skipped instead of rejected when a toolchain value it needs is unset.
  pub optional: bool,
}

const JAVAC_PARAMS: &[Param] = &[
  Param::JavacFlags,
  Param::Sourcepath,
  Param::BootClasspath,
  Param::Classpath,
  Param::Processorpath,
  Param::OutDir,
  Param::AnnoDir,
  Param::JavaVersion,
];

pub const JAVAC: RuleTemplate = RuleTemplate {
  stage: Stage::Javac,
  command: concat!(
    r#"rm -rf "$${param:outDir}" "$${param:annoDir}" && "#,
    r#"mkdir -p "$${param:outDir}" "$${param:annoDir}" && "#,
    "$${config:javacWrapper}$${config:javac} $${config:javacHeapFlags} $${config:commonJdkFlags} ",
    "$${param:javacFlags} $${param:sourcepath} $${param:bootClasspath} $${param:classpath} $${param:processorpath} ",
    "-source $${param:javaVersion} -target $${param:javaVersion} ",
    "-d $${param:outDir} -s $${param:annoDir} @$${rspfile} && ",
    "$${config:soongZip} -jar -o $${out} -C $${param:outDir} -D $${param:outDir}",
  ),
  params: JAVAC_PARAMS,
  rspfile: true,
  optional: false,
};

pub const ERROR_PRONE: RuleTemplate = RuleTemplate {
  stage: Stage::ErrorProne,
  command: concat!(
    r#"rm -rf "$${param:outDir}" "$${param:annoDir}" && "#,
    r#"mkdir -p "$${param:outDir}" "$${param:annoDir}" && "#,
    "$${config:java} -Xbootclasspath/p:$${config:errorProneJavacJar} ",
    "-cp $${config:errorProneJar} com.google.errorprone.ErrorProneCompiler ",
    "$${config:commonJdkFlags} ",
    "$${param:javacFlags} $${param:sourcepath} $${param:bootClasspath} $${param:classpath} $${param:processorpath} ",
    "-source $${param:javaVersion} -target $${param:javaVersion} ",
    "-d $${param:outDir} -s $${param:annoDir} @$${rspfile} && ",
    "$${config:soongZip} -jar -o $${out} -C $${param:outDir} -D $${param:outDir}",
  ),
  params: JAVAC_PARAMS,
  rspfile: true,
  optional: true,
};

pub const JAR: RuleTemplate = RuleTemplate {
  stage: Stage::Jar,
  command: "$${config:soongZip} -jar -o $${out} $${param:jarArgs}",
  params: &[Param::JarArgs],
  rspfile: false,
  optional: false,
};

pub const COMBINE_JAR: RuleTemplate = RuleTemplate {
  stage: Stage::CombineJar,
  command: "$${config:mergeZips} -j $${param:jarArgs} $${out} $${in}",
  params: &[Param::JarArgs],
  rspfile: false,
  optional: false,
};

pub const DESUGAR: RuleTemplate = RuleTemplate {
  stage: Stage::Desugar,
  command: concat!(
    "rm -rf $${param:dumpDir} && mkdir -p $${param:dumpDir} && ",
    "$${config:java} -Djdk.internal.lambda.dumpProxyClasses=$(cd $${param:dumpDir} && pwd) ",
    "$${param:javaFlags} -jar $${config:desugarJar} $${param:classpathFlags} $${param:desugarFlags} ",
    "-i $${in} -o $${out}",
  ),
  params: &[Param::DumpDir, Param::JavaFlags, Param::ClasspathFlags, Param::DesugarFlags],
  rspfile: false,
  optional: false,
};

pub const DX: RuleTemplate = RuleTemplate {
  stage: Stage::Dx,
  command: concat!(
    r#"rm -rf "$${param:outDir}" && mkdir -p "$${param:outDir}" && "#,
    "$${config:dx} --dex --output=$${param:outDir} $${param:dxFlags} $${in} && ",
    "$${config:soongZip} -o $${param:outDir}/classes.dex.jar -C $${param:outDir} -D $${param:outDir} && ",
    r#"$${config:mergeZips} -D -stripFile "*.class" $${out} $${param:outDir}/classes.dex.jar $${in}"#,
  ),
  params: &[Param::OutDir, Param::DxFlags],
  rspfile: false,
  optional: false,
};

pub const JARJAR: RuleTemplate = RuleTemplate {
  stage: Stage::JarJar,
  command: "$${config:java} -jar $${config:jarjar} process $${param:rulesFile} $${in} $${out}",
  params: &[Param::RulesFile],
  rspfile: false,
  optional: false,
};

/// All templates, in registration order.
pub const TEMPLATES: [RuleTemplate; 7] = [JAVAC, ERROR_PRONE, JAR, COMBINE_JAR, DESUGAR, DX, JARJAR];
