//! Typed inputs for the multipart create and update endpoints.
//!
//! Each draft validates the fields its admin form marks as required and
//! encodes itself as a [`MultipartForm`]. Unset optional fields are left out
//! of the form entirely.

use bon::Builder;
use chrono::NaiveDate;
use smol_str::SmolStr;

use dhartirakshak_common::{ApiResult, ClientError, FilePart, MultipartForm};

/// Date format the API expects for date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Something that can be sent as a multipart create or update body.
pub trait IntoForm {
    /// Check the fields a create requires.
    fn validate_create(&self) -> ApiResult<()> {
        Ok(())
    }

    /// Check the fields an update requires.
    fn validate_update(&self) -> ApiResult<()> {
        Ok(())
    }

    /// Encode as a form.
    fn into_form(self) -> MultipartForm;
}

impl IntoForm for MultipartForm {
    fn into_form(self) -> MultipartForm {
        self
    }
}

fn filled(value: &Option<SmolStr>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn require(ok: bool, message: &'static str) -> ApiResult<()> {
    if ok {
        Ok(())
    } else {
        Err(ClientError::invalid(message))
    }
}

fn date(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format(DATE_FORMAT).to_string())
}

/// Agriculture news item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct NewsDraft {
    /// Title
    #[builder(into)]
    pub title: Option<SmolStr>,
    /// Body text
    #[builder(into)]
    pub description: Option<SmolStr>,
    /// Only sent on update
    #[builder(into)]
    pub heading: Option<SmolStr>,
    /// Cover image
    pub image: Option<FilePart>,
    /// Sent as `1`/`0` on create
    #[builder(default)]
    pub is_trending: bool,
}

impl IntoForm for NewsDraft {
    fn validate_create(&self) -> ApiResult<()> {
        require(
            filled(&self.title) && self.image.is_some(),
            "Title and Image are required",
        )
    }

    fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .text_opt("title", self.title)
            .text_opt("description", self.description)
            .text_opt("heading", self.heading)
            .file_opt("image", self.image)
            .text("is_trending", if self.is_trending { "1" } else { "0" })
    }
}

/// Trending ticker item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct TrendingDraft {
    /// Title
    #[builder(into)]
    pub title: Option<SmolStr>,
    /// Body text
    #[builder(into)]
    pub description: Option<SmolStr>,
    /// Cover image
    pub image: Option<FilePart>,
}

impl IntoForm for TrendingDraft {
    fn validate_create(&self) -> ApiResult<()> {
        require(
            filled(&self.title) && self.image.is_some(),
            "Title and Image are required",
        )
    }

    fn validate_update(&self) -> ApiResult<()> {
        require(filled(&self.title), "Title is required")
    }

    fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .text_opt("title", self.title)
            .text_opt("description", self.description)
            .file_opt("image", self.image)
    }
}

/// Home page banner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct BannerDraft {
    /// Title
    #[builder(into)]
    pub title: Option<SmolStr>,
    /// Byline
    #[builder(into)]
    pub author: Option<SmolStr>,
    /// Sub-heading
    #[builder(into)]
    pub heading: Option<SmolStr>,
    /// Body text
    #[builder(into)]
    pub description: Option<SmolStr>,
    /// Cover image
    pub image: Option<FilePart>,
}

impl IntoForm for BannerDraft {
    fn validate_create(&self) -> ApiResult<()> {
        require(
            filled(&self.title) && self.image.is_some(),
            "Title and Image are required",
        )
    }

    fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .text_opt("title", self.title)
            .text_opt("author", self.author)
            .text_opt("heading", self.heading)
            .text_opt("description", self.description)
            .file_opt("image", self.image)
    }
}

/// Advertisement placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct AdvertisementDraft {
    /// Title
    #[builder(into)]
    pub title: Option<SmolStr>,
    /// Body text
    #[builder(into)]
    pub description: Option<SmolStr>,
    /// Advertiser
    #[builder(into)]
    pub company: Option<SmolStr>,
    /// Click-through URL
    #[builder(into)]
    pub link: Option<SmolStr>,
    /// Cover image
    pub image: Option<FilePart>,
    /// Category the ad runs under
    #[builder(into)]
    pub category_id: Option<SmolStr>,
    /// First day shown
    pub start_date: Option<NaiveDate>,
    /// Last day shown
    pub end_date: Option<NaiveDate>,
}

impl IntoForm for AdvertisementDraft {
    fn validate_create(&self) -> ApiResult<()> {
        require(
            filled(&self.title) && filled(&self.company) && self.image.is_some(),
            "Title, Company and Image are required",
        )
    }

    fn validate_update(&self) -> ApiResult<()> {
        require(
            filled(&self.title) && filled(&self.company),
            "Title and Company are required",
        )
    }

    fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .text_opt("title", self.title)
            .text_opt("description", self.description)
            .text_opt("company", self.company)
            .text_opt("link", self.link)
            .file_opt("image", self.image)
            .text_opt("category_id", self.category_id)
            .text_opt("start_date", date(self.start_date))
            .text_opt("end_date", date(self.end_date))
    }
}

/// E-paper upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct EpaperDraft {
    /// The PDF itself
    pub pdf: Option<FilePart>,
    /// Issue date
    pub publish_date: Option<NaiveDate>,
}

impl IntoForm for EpaperDraft {
    fn validate_create(&self) -> ApiResult<()> {
        require(
            self.pdf.is_some() && self.publish_date.is_some(),
            "PDF and publish date are required",
        )
    }

    fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .file_opt("pdf", self.pdf)
            .text_opt("publish_date", date(self.publish_date))
    }
}

/// Research write-up submitted from the public site.
///
/// `title`, `description` and `type` are always sent, empty if unset. The
/// cover goes in `image`; extra pictures go in `images[1]`, `images[2]`, ...
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct ResearchSubmission {
    /// Title
    #[builder(into, default)]
    pub title: SmolStr,
    /// Body text
    #[builder(into, default)]
    pub description: SmolStr,
    /// Free-form research type, e.g. `agriculture`
    #[builder(into, default)]
    pub kind: SmolStr,
    /// Cover image
    pub image: Option<FilePart>,
    /// Additional pictures
    #[builder(default)]
    pub images: Vec<FilePart>,
}

impl IntoForm for ResearchSubmission {
    fn validate_create(&self) -> ApiResult<()> {
        require(!self.title.trim().is_empty(), "Title is required")
    }

    fn into_form(self) -> MultipartForm {
        let mut form = MultipartForm::new()
            .text("title", self.title)
            .text("description", self.description)
            .text("type", self.kind)
            .file_opt("image", self.image);
        for (index, file) in self.images.into_iter().enumerate() {
            form = form.file(format!("images[{}]", index + 1), file);
        }
        form
    }
}

/// Public user signup.
///
/// Empty strings are skipped like unset values. `image` and `documents` may
/// carry several files each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
#[builder(start_fn = new)]
pub struct SignupForm {
    /// Full name
    #[builder(into)]
    pub name: Option<SmolStr>,
    /// Login email
    #[builder(into)]
    pub email: Option<SmolStr>,
    /// Login password
    #[builder(into)]
    pub password: Option<SmolStr>,
    /// Phone number
    #[builder(into)]
    pub phone: Option<SmolStr>,
    /// Cover image
    #[builder(default)]
    pub image: Vec<FilePart>,
    /// Supporting documents
    #[builder(default)]
    pub documents: Vec<FilePart>,
}

impl IntoForm for SignupForm {
    fn into_form(self) -> MultipartForm {
        MultipartForm::new()
            .text_non_empty("name", self.name)
            .text_non_empty("email", self.email)
            .text_non_empty("password", self.password)
            .text_non_empty("phone", self.phone)
            .files("image", self.image)
            .files("documents", self.documents)
    }
}
