// ─── JNLP Descriptor ───
// Serde model of a JNLP document plus the platform/URL questions the
// launcher asks of it.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::core::error::{LauncherError, LauncherResult};

use super::platform::{is_relevant, Platform};

/// Root `<jnlp>` element.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Descriptor {
    #[serde(rename = "@codebase", default)]
    pub codebase: String,
    #[serde(rename = "@spec", default)]
    pub spec: Option<String>,
    /// Self reference used for update checks.
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "@version", default)]
    pub version: Option<String>,
    #[serde(rename = "information", default)]
    pub information: Vec<Information>,
    #[serde(rename = "resources", default)]
    pub resources: Vec<ResourceSet>,
    #[serde(rename = "application-desc", default)]
    pub application: Option<ApplicationDesc>,
    #[serde(rename = "applet-desc", default)]
    pub applet: Option<AppletDesc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Information {
    #[serde(rename = "@os", default)]
    pub os: String,
    #[serde(rename = "@arch", default)]
    pub arch: String,
    #[serde(rename = "@locale", default)]
    pub locale: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub homepage: Option<Homepage>,
    #[serde(rename = "description", default)]
    pub descriptions: Vec<Description>,
    #[serde(rename = "icon", default)]
    pub icons: Vec<Icon>,
    #[serde(default)]
    pub shortcut: Option<Shortcut>,
    #[serde(default)]
    pub desktop: Option<Marker>,
    #[serde(default)]
    pub menu: Option<Menu>,
    #[serde(rename = "offline-allowed", default)]
    pub offline_allowed: Option<Marker>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Element whose presence is the whole message (`<offline-allowed/>`, `<desktop/>`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Marker {}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Homepage {
    #[serde(rename = "@href", default)]
    pub href: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Description {
    /// `one-line`, `short`, `tooltip` or empty.
    #[serde(rename = "@kind", default)]
    pub kind: String,
    #[serde(rename = "$text", default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Icon {
    #[serde(rename = "@href")]
    pub href: String,
    /// `default`, `selected`, `disabled`, `rollover`, `splash`, `shortcut` or empty.
    #[serde(rename = "@kind", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Shortcut {
    #[serde(rename = "@online", default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub desktop: Option<Marker>,
    #[serde(default)]
    pub menu: Option<Menu>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Menu {
    #[serde(rename = "@submenu", default)]
    pub submenu: Option<String>,
}

/// One `<resources>` block, optionally filtered by os/arch/locale.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResourceSet {
    #[serde(rename = "@os", default)]
    pub os: String,
    #[serde(rename = "@arch", default)]
    pub arch: String,
    #[serde(rename = "@locale", default)]
    pub locale: String,
    #[serde(rename = "jar", default)]
    pub jars: Vec<JarRef>,
    #[serde(rename = "nativelib", default)]
    pub native_libs: Vec<NativeLibRef>,
    #[serde(rename = "extension", default)]
    pub extensions: Vec<ExtensionRef>,
    #[serde(rename = "property", default)]
    pub properties: Vec<Property>,
    #[serde(rename = "j2se", default)]
    pub j2se: Vec<JavaRequirement>,
    /// `<java>` is a synonym for `<j2se>`.
    #[serde(rename = "java", default)]
    pub java: Vec<JavaRequirement>,
}

/// A downloadable archive reference (`<jar>` or `<nativelib>`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ArchiveRef {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@version", default)]
    pub version: Option<String>,
    /// Archive holds the class with the main method.
    #[serde(rename = "@main", default)]
    pub main: bool,
    #[serde(rename = "@download", default)]
    pub download: Option<String>,
    /// Downloadable size hint in bytes.
    #[serde(rename = "@size", default)]
    pub size: Option<u64>,
    #[serde(rename = "@part", default)]
    pub part: Option<String>,
}

pub type JarRef = ArchiveRef;
pub type NativeLibRef = ArchiveRef;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExtensionRef {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@version", default)]
    pub version: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct JavaRequirement {
    #[serde(rename = "@version", default)]
    pub version: String,
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
    #[serde(rename = "@java-vm-args", default)]
    pub java_vm_args: Option<String>,
    #[serde(rename = "@initial-heap-size", default)]
    pub initial_heap_size: Option<String>,
    #[serde(rename = "@max-heap-size", default)]
    pub max_heap_size: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Property {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@value", default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApplicationDesc {
    #[serde(rename = "@main-class", default)]
    pub main_class: Option<String>,
    #[serde(rename = "argument", default)]
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppletDesc {
    #[serde(rename = "@main-class", default)]
    pub main_class: Option<String>,
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
}

/// An `<extension>` with its href resolved against the codebase.
#[derive(Debug, Clone)]
pub struct ResolvedExtension {
    pub name: String,
    pub href: String,
    pub url: Url,
}

/// Everything the relevant resource sets contribute, in document order.
#[derive(Debug, Clone, Default)]
pub struct ResolvedResources {
    pub jars: Vec<Url>,
    pub native_libs: Vec<Url>,
    pub extensions: Vec<ResolvedExtension>,
    pub properties: Vec<Property>,
    pub jvm_args: Vec<String>,
    pub java_versions: Vec<String>,
}

impl ResolvedResources {
    /// Jars first, native-library archives after; both go through the same fetch path.
    pub fn archives(&self) -> Vec<Url> {
        self.jars
            .iter()
            .chain(self.native_libs.iter())
            .cloned()
            .collect()
    }
}

impl Descriptor {
    /// Parse raw JNLP bytes.
    pub fn parse(bytes: &[u8]) -> LauncherResult<Self> {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| LauncherError::Parse(format!("descriptor is not UTF-8: {e}")))?;
        let xml = xml.trim_start_matches('\u{feff}');

        ensure_jnlp_root(xml)?;

        let descriptor: Descriptor =
            quick_xml::de::from_str(xml).map_err(|e| LauncherError::Parse(e.to_string()))?;
        Ok(descriptor)
    }

    /// The `<information>` block that applies here: the first without a
    /// locale restriction, otherwise the first one present.
    pub fn information(&self) -> Option<&Information> {
        self.information
            .iter()
            .find(|info| info.locale.trim().is_empty())
            .or_else(|| self.information.first())
    }

    /// Title of the application or empty string if `<information>` is missing.
    pub fn title(&self) -> &str {
        self.information().map(|i| i.title.as_str()).unwrap_or("")
    }

    pub fn is_offline_allowed(&self) -> bool {
        self.information
            .iter()
            .any(|info| info.offline_allowed.is_some())
    }

    pub fn icons(&self) -> &[Icon] {
        self.information().map(|i| i.icons.as_slice()).unwrap_or(&[])
    }

    /// Non-empty self reference href.
    pub fn self_href(&self) -> Option<&str> {
        self.href.as_deref().map(str::trim).filter(|h| !h.is_empty())
    }

    /// Absolute codebase, or `None` when the document has no codebase.
    pub fn base_url(&self) -> LauncherResult<Option<Url>> {
        if self.codebase.trim().is_empty() {
            return Ok(None);
        }
        resolve_codebase(&self.codebase).map(Some)
    }

    /// URL of the self reference, resolved against the codebase.
    pub fn self_url(&self) -> LauncherResult<Option<Url>> {
        let Some(href) = self.self_href() else {
            return Ok(None);
        };
        let base = self.base_url()?;
        resolve_href(base.as_ref(), href).map(Some)
    }

    /// Resource sets that apply to `platform`, in document order.
    pub fn relevant_resource_sets(&self, platform: &Platform) -> Vec<&ResourceSet> {
        self.resources
            .iter()
            .filter(|resources| {
                let relevant = is_relevant(&resources.os, &resources.arch, platform);
                debug!(
                    "resources for os='{}' arch='{}' relevant on current platform: {}",
                    resources.os, resources.arch, relevant
                );
                relevant
            })
            .collect()
    }

    /// Resolve every href of the relevant resource sets against the codebase and
    /// aggregate properties and JVM arguments (later sets append).
    pub fn resolve_resources(&self, platform: &Platform) -> LauncherResult<ResolvedResources> {
        let base = self.base_url()?;
        let mut resolved = ResolvedResources::default();

        for resources in self.relevant_resource_sets(platform) {
            for jar in &resources.jars {
                resolved.jars.push(resolve_href(base.as_ref(), &jar.href)?);
            }
            for native in &resources.native_libs {
                resolved
                    .native_libs
                    .push(resolve_href(base.as_ref(), &native.href)?);
            }
            for extension in &resources.extensions {
                let url = resolve_href(base.as_ref(), &extension.href)?;
                let name = extension
                    .name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| extension.href.clone());
                resolved.extensions.push(ResolvedExtension {
                    name,
                    href: extension.href.clone(),
                    url,
                });
            }
            resolved
                .properties
                .extend(resources.properties.iter().cloned());
            if let Some(requirement) = resources.runtime_requirement() {
                if let Some(args) = requirement.java_vm_args.as_deref() {
                    resolved
                        .jvm_args
                        .extend(args.split_whitespace().map(str::to_string));
                }
                if !requirement.version.trim().is_empty() {
                    resolved.java_versions.push(requirement.version.clone());
                }
            }
        }

        Ok(resolved)
    }

    /// The application descriptor, failing explicitly for applet-only documents.
    pub fn application(&self) -> LauncherResult<&ApplicationDesc> {
        if let Some(app) = &self.application {
            return Ok(app);
        }
        if self.applet.is_some() {
            return Err(LauncherError::UnsupportedDescriptor(
                "found <applet-desc> tag but applets are not supported".into(),
            ));
        }
        Err(LauncherError::UnsupportedDescriptor(
            "<application-desc> tag wasn't found in JNLP file".into(),
        ))
    }
}

impl ResourceSet {
    /// `<j2se>` wins over its `<java>` synonym.
    pub fn runtime_requirement(&self) -> Option<&JavaRequirement> {
        self.j2se.first().or_else(|| self.java.first())
    }
}

impl Information {
    /// First of tooltip, short and untyped description text.
    pub fn shortcut_description(&self) -> &str {
        for kind in ["tooltip", "short", ""] {
            let found = self
                .descriptions
                .iter()
                .rev()
                .find(|d| d.kind == kind && !d.text.trim().is_empty());
            if let Some(desc) = found {
                return desc.text.trim();
            }
        }
        ""
    }

    pub fn wants_desktop_shortcut(&self) -> bool {
        self.desktop.is_some()
            || self
                .shortcut
                .as_ref()
                .is_some_and(|shortcut| shortcut.desktop.is_some())
    }

    /// Menu preference; only honoured inside `<shortcut>`.
    pub fn menu_preference(&self) -> Option<&Menu> {
        self.shortcut.as_ref().and_then(|shortcut| shortcut.menu.as_ref())
    }

    pub fn submenu(&self) -> &str {
        self.menu_preference()
            .and_then(|menu| menu.submenu.as_deref())
            .unwrap_or("")
    }
}

impl Icon {
    pub fn is_shortcut_kind(&self) -> bool {
        matches!(self.kind.as_str(), "" | "default" | "shortcut")
    }

    pub fn is_splash(&self) -> bool {
        self.kind == "splash"
    }
}

/// Parse a codebase URL, adding the trailing slash relative resolution needs.
pub fn resolve_codebase(raw: &str) -> LauncherResult<Url> {
    let mut codebase = normalize_url(raw.trim());
    if !codebase.ends_with('/') {
        codebase.push('/');
    }
    Url::parse(&codebase).map_err(|source| LauncherError::InvalidUrl {
        url: codebase,
        source,
    })
}

/// Resolve `href` against `base`; absolute hrefs are taken as-is.
pub fn resolve_href(base: Option<&Url>, href: &str) -> LauncherResult<Url> {
    let href = href.trim();
    match Url::parse(href) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base.ok_or_else(|| {
                LauncherError::Parse(format!("relative href '{href}' without codebase"))
            })?;
            base.join(href).map_err(|source| LauncherError::InvalidUrl {
                url: href.to_string(),
                source,
            })
        }
        Err(source) => Err(LauncherError::InvalidUrl {
            url: href.to_string(),
            source,
        }),
    }
}

/// Map the `jnlp://` / `jnlps://` browser schemes onto HTTP.
pub fn normalize_url(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix("jnlp://") {
        format!("http://{rest}")
    } else if let Some(rest) = raw.strip_prefix("jnlps://") {
        format!("https://{rest}")
    } else {
        raw.to_string()
    }
}

fn ensure_jnlp_root(xml: &str) -> LauncherResult<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return if e.local_name().as_ref() == b"jnlp" {
                    Ok(())
                } else {
                    Err(LauncherError::Parse(format!(
                        "root element is <{}>, expected <jnlp>",
                        String::from_utf8_lossy(e.local_name().as_ref())
                    )))
                };
            }
            Ok(Event::Eof) => {
                return Err(LauncherError::Parse("document has no root element".into()))
            }
            Ok(_) => continue,
            Err(e) => return Err(LauncherError::Parse(e.to_string())),
        }
    }
}
