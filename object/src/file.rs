//! A data set paired with its file meta group,
//! and its conversion to and from a byte buffer.
use crate::mem::InMemDicomObject;
use crate::meta::{self, FileMetaTable, FileMetaTableBuilder, DICM_MAGIC_CODE};
use crate::read::{self, read_dataset, ReadOptions};
use crate::write::{self, DataSetWriter, WriteOptions};
use dcmbridge_core::DataDictionary;
use dcmbridge_dictionary_std::tags;
use dcmbridge_encoding::transfer_syntax::{EXPLICIT_VR_LITTLE_ENDIAN, IMPLICIT_VR_LITTLE_ENDIAN};
use dcmbridge_encoding::{TransferSyntax, TransferSyntaxRegistry};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use tracing::{debug, error};

/// The length of the file preamble, which is written as zeros.
const PREAMBLE_LEN: usize = 128;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The file meta group could not be read.
    #[snafu(display("Could not read the file meta group of a {}-byte buffer", bytes))]
    ReadMeta {
        bytes: usize,
        #[snafu(backtrace)]
        source: meta::Error,
    },
    /// The data set could not be read.
    #[snafu(display("Could not parse the data set of a {}-byte buffer", bytes))]
    ReadDataSet {
        bytes: usize,
        #[snafu(backtrace)]
        source: read::Error,
    },
    /// The transfer syntax has no native codec nor pass-through.
    #[snafu(display("Unsupported transfer syntax `{}`", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },
    /// The file meta group could not be rebuilt for writing.
    #[snafu(display("Could not build the file meta group"))]
    BuildMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },
    /// The file meta group could not be written.
    #[snafu(display("Could not write the file meta group"))]
    WriteMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },
    /// The data set could not be written.
    #[snafu(display("Could not write the data set"))]
    WriteDataSet {
        #[snafu(backtrace)]
        source: write::Error,
    },
    /// The output grew larger than its estimated size.
    #[snafu(display(
        "Internal error: estimated {} bytes but wrote {}",
        estimate,
        actual
    ))]
    BufferEstimate {
        estimate: usize,
        actual: usize,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/** A DICOM data set, together with the file meta group
 * which was read alongside it, if any.
 *
 * The meta group records the transfer syntax of the source,
 * which is reused when the object is saved again.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct FileDicomObject {
    meta: Option<FileMetaTable>,
    obj: InMemDicomObject,
}

impl FileDicomObject {
    /// Pair a data set with a file meta group.
    pub fn new(meta: FileMetaTable, obj: InMemDicomObject) -> Self {
        FileDicomObject {
            meta: Some(meta),
            obj,
        }
    }

    /// Wrap a data set which has no file meta group yet.
    pub fn from_object(obj: InMemDicomObject) -> Self {
        FileDicomObject { meta: None, obj }
    }

    /// Retrieve the file meta group, if any.
    pub fn meta(&self) -> Option<&FileMetaTable> {
        self.meta.as_ref()
    }

    /// Retrieve the data set.
    pub fn obj(&self) -> &InMemDicomObject {
        &self.obj
    }

    /// Retrieve the data set for modification.
    pub fn obj_mut(&mut self) -> &mut InMemDicomObject {
        &mut self.obj
    }

    /// Take the data set, discarding the file meta group.
    pub fn into_inner(self) -> InMemDicomObject {
        self.obj
    }

    /// The transfer syntax UID recorded in the file meta group.
    pub fn transfer_syntax_uid(&self) -> Option<&str> {
        self.meta.as_ref().map(|m| m.transfer_syntax.as_str())
    }

    /// Look up the transfer syntax recorded in the file meta group.
    ///
    /// Returns `None` if there is no meta group
    /// or if its transfer syntax is not known.
    pub fn transfer_syntax(&self) -> Option<&'static TransferSyntax> {
        TransferSyntaxRegistry.get(self.transfer_syntax_uid()?)
    }

    /// Decode a byte buffer into a fully materialized object.
    ///
    /// The buffer may start with the 128-byte preamble,
    /// directly with the `DICM` magic code,
    /// or hold a bare data set in implicit VR little endian.
    /// The dictionary resolves value representations
    /// in implicit VR transfer syntaxes.
    pub fn from_buffer<D>(bytes: &[u8], dict: &D) -> Result<Self>
    where
        D: DataDictionary + ?Sized,
    {
        Self::from_buffer_with_options(bytes, dict, ReadOptions::default())
    }

    /// Decode a byte buffer into a fully materialized object,
    /// with the given reading options.
    pub fn from_buffer_with_options<D>(
        bytes: &[u8],
        dict: &D,
        options: ReadOptions,
    ) -> Result<Self>
    where
        D: DataDictionary + ?Sized,
    {
        let total = bytes.len();
        let start = if bytes.get(PREAMBLE_LEN..PREAMBLE_LEN + 4) == Some(&DICM_MAGIC_CODE[..]) {
            Some(PREAMBLE_LEN)
        } else if bytes.starts_with(&DICM_MAGIC_CODE) {
            Some(0)
        } else {
            None
        };

        let Some(start) = start else {
            debug!("No file meta group, reading as implicit VR little endian");
            let decoder = IMPLICIT_VR_LITTLE_ENDIAN
                .decoder(dict)
                .context(UnsupportedTransferSyntaxSnafu {
                    uid: IMPLICIT_VR_LITTLE_ENDIAN.uid(),
                })?;
            let obj = read_dataset(bytes, &decoder, options)
                .context(ReadDataSetSnafu { bytes: total })?;
            return Ok(FileDicomObject::from_object(obj));
        };

        let mut source = &bytes[start..];
        let meta = FileMetaTable::from_reader(&mut source).context(ReadMetaSnafu { bytes: total })?;
        let decoder = TransferSyntaxRegistry
            .get(&meta.transfer_syntax)
            .and_then(|ts| ts.decoder(dict))
            .context(UnsupportedTransferSyntaxSnafu {
                uid: meta.transfer_syntax.as_str(),
            })?;
        let obj =
            read_dataset(source, &decoder, options).context(ReadDataSetSnafu { bytes: total })?;
        Ok(FileDicomObject::new(meta, obj))
    }

    /// Encode the object into the given buffer,
    /// replacing its previous contents.
    ///
    /// The recorded transfer syntax is used if there is one,
    /// otherwise explicit VR little endian.
    /// On failure the buffer is left empty.
    pub fn save_to_buffer(&self, buffer: &mut Vec<u8>) -> Result<()> {
        self.save_to_buffer_with_options(buffer, WriteOptions::default())
    }

    /// Encode the object into the given buffer,
    /// with the given writing options.
    pub fn save_to_buffer_with_options(
        &self,
        buffer: &mut Vec<u8>,
        options: WriteOptions,
    ) -> Result<()> {
        buffer.clear();
        let outcome = self.write_buffer(buffer, options);
        if outcome.is_err() {
            buffer.clear();
            buffer.shrink_to_fit();
        }
        outcome
    }

    fn write_buffer(&self, buffer: &mut Vec<u8>, options: WriteOptions) -> Result<()> {
        let ts = self.output_transfer_syntax()?;
        let meta = self.rebuild_meta(ts)?;
        let writer = DataSetWriter::new(ts, options).context(WriteDataSetSnafu)?;

        let estimate = PREAMBLE_LEN
            + meta.encoded_len()
            + writer.encoded_len(&self.obj).context(WriteDataSetSnafu)?;
        buffer.reserve_exact(estimate);

        buffer.resize(PREAMBLE_LEN, 0);
        meta.write(&mut *buffer).context(WriteMetaSnafu)?;
        writer
            .write_dataset(buffer, &self.obj)
            .context(WriteDataSetSnafu)?;

        let actual = buffer.len();
        if actual > estimate {
            error!(
                "Output buffer estimate undershot: {} bytes estimated, {} written",
                estimate, actual
            );
            return BufferEstimateSnafu { estimate, actual }.fail();
        }
        buffer.shrink_to_fit();
        Ok(())
    }

    /// Choose the transfer syntax for writing.
    fn output_transfer_syntax(&self) -> Result<&'static TransferSyntax> {
        let Some(uid) = self.transfer_syntax_uid() else {
            debug!("No transfer syntax recorded, writing explicit VR little endian");
            return Ok(&EXPLICIT_VR_LITTLE_ENDIAN);
        };
        match TransferSyntaxRegistry.get(uid) {
            Some(ts) => {
                ensure!(ts.is_supported(), UnsupportedTransferSyntaxSnafu { uid });
                debug!("Writing with transfer syntax {} ({})", ts.uid(), ts.name());
                Ok(ts)
            }
            None => {
                debug!(
                    "Unknown transfer syntax `{}`, writing explicit VR little endian",
                    uid
                );
                Ok(&EXPLICIT_VR_LITTLE_ENDIAN)
            }
        }
    }

    /// Build the file meta group to write with the object.
    fn rebuild_meta(&self, ts: &TransferSyntax) -> Result<FileMetaTable> {
        let mut builder = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(self.obj.ascii_value(tags::SOP_CLASS_UID).unwrap_or_default())
            .media_storage_sop_instance_uid(
                self.obj
                    .ascii_value(tags::SOP_INSTANCE_UID)
                    .unwrap_or_default(),
            )
            .transfer_syntax(ts.uid());
        if let Some(title) = self
            .meta
            .as_ref()
            .and_then(|m| m.source_application_entity_title.as_ref())
        {
            builder = builder.source_application_entity_title(title.as_str());
        }
        builder.build().context(BuildMetaSnafu)
    }
}
